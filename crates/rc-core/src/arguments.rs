//! `${name}` templating for descriptor arguments

use std::collections::HashMap;
use std::path::Path;

use rc_meta::{ArgEntry, OsName, allows};

/// Values substituted into argument templates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchVariables {
    values: HashMap<String, String>,
}

impl LaunchVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn set_path(&mut self, name: impl Into<String>, path: &Path) -> &mut Self {
        self.set(name, path.to_string_lossy())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Replace every `${name}` whose name is known; unknown names stay literal
pub fn substitute(template: &str, variables: &LaunchVariables) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match variables.get(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Render a structured argument list for `os`
pub fn render(entries: &[ArgEntry], variables: &LaunchVariables, os: OsName) -> Vec<String> {
    entries
        .iter()
        .flat_map(|entry| match entry {
            ArgEntry::Plain(template) => vec![substitute(template, variables)],
            ArgEntry::Conditional { rules, values } if allows(rules, os) => values
                .iter()
                .map(|template| substitute(template, variables))
                .collect(),
            ArgEntry::Conditional { .. } => Vec::new(),
        })
        .collect()
}

/// Render a legacy space-delimited argument string
pub fn render_legacy(arguments: &str, variables: &LaunchVariables) -> Vec<String> {
    arguments
        .split_whitespace()
        .map(|token| substitute(token, variables))
        .collect()
}

/// Drop classpath and native-path switches from descriptor JVM arguments;
/// the launcher supplies its own.
pub fn strip_managed_jvm_args(args: Vec<String>) -> Vec<String> {
    let mut kept = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "-cp" || arg == "-classpath" || arg == "--class-path" {
            iter.next();
            continue;
        }
        if arg.starts_with("-Djava.library.path=") {
            continue;
        }
        kept.push(arg);
    }
    kept
}
