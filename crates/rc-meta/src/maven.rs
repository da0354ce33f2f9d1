use std::fmt;

/// A parsed `group:artifact:version[:classifier]` coordinate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MavenCoordinate {
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub classifier: Option<String>,
}

impl MavenCoordinate {
    /// Parse a coordinate; `None` when it has fewer than three parts
    pub fn parse(coord: &str) -> Option<Self> {
        let mut parts = coord.split(':');
        let group = parts.next().filter(|s| !s.is_empty())?;
        let artifact = parts.next().filter(|s| !s.is_empty())?;
        let version = parts.next().filter(|s| !s.is_empty())?;
        let classifier = parts.next().filter(|s| !s.is_empty());

        Some(Self {
            group: group.to_string(),
            artifact: artifact.to_string(),
            version: version.to_string(),
            classifier: classifier.map(str::to_string),
        })
    }

    /// `artifact-version[-classifier].jar`
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}-{}-{}.jar", self.artifact, self.version, c),
            None => format!("{}-{}.jar", self.artifact, self.version),
        }
    }

    /// Repository-relative path with `/` separators,
    /// e.g. `org/ow2/asm/asm/9.9/asm-9.9.jar`
    pub fn relative_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact,
            self.version,
            self.file_name()
        )
    }

    /// Full URL under a repository base
    pub fn url(&self, repository: &str) -> String {
        format!("{}/{}", repository.trim_end_matches('/'), self.relative_path())
    }
}

impl fmt::Display for MavenCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{c}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path() {
        let c = MavenCoordinate::parse("org.ow2.asm:asm:9.9").unwrap();
        assert_eq!(c.relative_path(), "org/ow2/asm/asm/9.9/asm-9.9.jar");
    }

    #[test]
    fn test_classifier() {
        let c = MavenCoordinate::parse("org.lwjgl:lwjgl:3.3.3:natives-linux").unwrap();
        assert_eq!(
            c.relative_path(),
            "org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3-natives-linux.jar"
        );
        assert_eq!(c.to_string(), "org.lwjgl:lwjgl:3.3.3:natives-linux");
    }

    #[test]
    fn test_too_short() {
        assert!(MavenCoordinate::parse("net.fabricmc:fabric-loader").is_none());
        assert!(MavenCoordinate::parse("").is_none());
    }

    #[test]
    fn test_url() {
        let c = MavenCoordinate::parse("net.fabricmc:intermediary:1.21.1").unwrap();
        assert_eq!(
            c.url("https://maven.fabricmc.net/"),
            "https://maven.fabricmc.net/net/fabricmc/intermediary/1.21.1/intermediary-1.21.1.jar"
        );
    }
}
