//! Closed table of editor languages and how each one is executed.
//!
//! Every per-language fact (label, extension, template, runner) is an
//! exhaustive `match`, so adding a variant fails to compile until each table
//! is filled in.

use serde::{Deserialize, Serialize};

/// Languages the editor knows about.
///
/// Unknown stored values deserialize to [`Language::PlainText`], which has no
/// runner and is reported as unsupported by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    Python,
    Java,
    Cpp,
    C,
    #[serde(other)]
    PlainText,
}

/// Where a language's code runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerKind {
    /// Sandboxed child process on this machine.
    Local,
    /// Remote execution service.
    Remote(RemoteTarget),
}

/// Remote runtime selection for a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteTarget {
    /// Language identifier understood by the remote service.
    pub language: &'static str,
    /// Pinned runtime version.
    pub version: &'static str,
    /// File name the remote compiler expects for the entry point.
    pub filename: &'static str,
}

impl Language {
    /// Languages offered in the language picker, default first.
    pub const SUPPORTED: [Language; 5] = [
        Language::JavaScript,
        Language::Python,
        Language::Java,
        Language::Cpp,
        Language::C,
    ];

    /// Identifier used in persisted state and on the wire.
    pub fn id(self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::PlainText => "plaintext",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Language::JavaScript => "JavaScript",
            Language::Python => "Python",
            Language::Java => "Java",
            Language::Cpp => "C++",
            Language::C => "C",
            Language::PlainText => "Plain Text",
        }
    }

    /// Canonical extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Language::JavaScript => ".js",
            Language::Python => ".py",
            Language::Java => ".java",
            Language::Cpp => ".cpp",
            Language::C => ".c",
            Language::PlainText => ".txt",
        }
    }

    /// Starter program shown for new files and after a language switch.
    pub fn template(self) -> &'static str {
        match self {
            Language::JavaScript => JAVASCRIPT_TEMPLATE,
            Language::Python => PYTHON_TEMPLATE,
            Language::Java => JAVA_TEMPLATE,
            Language::Cpp => CPP_TEMPLATE,
            Language::C => C_TEMPLATE,
            Language::PlainText => "",
        }
    }

    /// Runner for this language, or `None` when it cannot be executed.
    pub fn runner(self) -> Option<RunnerKind> {
        let target = match self {
            Language::JavaScript => return Some(RunnerKind::Local),
            Language::PlainText => return None,
            Language::Python => RemoteTarget {
                language: "python",
                version: "3.10.0",
                filename: "main.py",
            },
            Language::Java => RemoteTarget {
                language: "java",
                version: "15.0.2",
                filename: "Main.java",
            },
            Language::Cpp => RemoteTarget {
                language: "cpp",
                version: "10.2.0",
                filename: "main.cpp",
            },
            Language::C => RemoteTarget {
                language: "c",
                version: "10.2.0",
                filename: "main.c",
            },
        };
        Some(RunnerKind::Remote(target))
    }

    /// Parse a wire/CLI identifier. Only exact identifiers match.
    pub fn from_id(id: &str) -> Option<Language> {
        match id {
            "javascript" => Some(Language::JavaScript),
            "python" => Some(Language::Python),
            "java" => Some(Language::Java),
            "cpp" => Some(Language::Cpp),
            "c" => Some(Language::C),
            "plaintext" => Some(Language::PlainText),
            _ => None,
        }
    }

    /// Guess the language of a file loaded from disk by its extension.
    ///
    /// Unknown extensions fall back to JavaScript, the editor default.
    pub fn detect(file_name: &str) -> Language {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "py" => Language::Python,
            "java" => Language::Java,
            "cpp" | "cc" | "cxx" => Language::Cpp,
            "c" => Language::C,
            "txt" => Language::PlainText,
            _ => Language::JavaScript,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

const JAVASCRIPT_TEMPLATE: &str = r#"// Welcome to the Code Editor
console.log("Hello, World!");

function fibonacci(n) {
  if (n <= 1) return n;
  return fibonacci(n - 1) + fibonacci(n - 2);
}

console.log("Fibonacci(10):", fibonacci(10));"#;

const PYTHON_TEMPLATE: &str = r#"# Welcome to the Code Editor
print("Hello, World!")

def fibonacci(n):
    if n <= 1:
        return n
    return fibonacci(n - 1) + fibonacci(n - 2)

print(f"Fibonacci(10): {fibonacci(10)}")"#;

const JAVA_TEMPLATE: &str = r#"// Welcome to the Code Editor
public class Main {
    public static void main(String[] args) {
        System.out.println("Hello, World!");

        System.out.println("Fibonacci(10): " + fibonacci(10));
    }

    public static int fibonacci(int n) {
        if (n <= 1) return n;
        return fibonacci(n - 1) + fibonacci(n - 2);
    }
}"#;

const CPP_TEMPLATE: &str = r#"// Welcome to the Code Editor
#include <iostream>
using namespace std;

int fibonacci(int n) {
    if (n <= 1) return n;
    return fibonacci(n - 1) + fibonacci(n - 2);
}

int main() {
    cout << "Hello, World!" << endl;
    cout << "Fibonacci(10): " << fibonacci(10) << endl;
    return 0;
}"#;

const C_TEMPLATE: &str = r#"// Welcome to the Code Editor
#include <stdio.h>

int fibonacci(int n) {
    if (n <= 1) return n;
    return fibonacci(n - 1) + fibonacci(n - 2);
}

int main() {
    printf("Hello, World!\n");
    printf("Fibonacci(10): %d\n", fibonacci(10));
    return 0;
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_javascript_runs_locally() {
        for language in Language::SUPPORTED {
            let local = matches!(language.runner(), Some(RunnerKind::Local));
            assert_eq!(local, language == Language::JavaScript, "{language}");
        }
        assert_eq!(Language::PlainText.runner(), None);
    }

    #[test]
    fn java_uses_public_class_file_name() {
        let Some(RunnerKind::Remote(target)) = Language::Java.runner() else {
            panic!("java must run remotely");
        };
        assert_eq!(target.filename, "Main.java");
        assert_eq!(target.version, "15.0.2");
    }

    #[test]
    fn detect_maps_known_extensions() {
        assert_eq!(Language::detect("script.PY"), Language::Python);
        assert_eq!(Language::detect("a.cc"), Language::Cpp);
        assert_eq!(Language::detect("a.cxx"), Language::Cpp);
        assert_eq!(Language::detect("mod.mjs"), Language::JavaScript);
        assert_eq!(Language::detect("notes.txt"), Language::PlainText);
        assert_eq!(Language::detect("Makefile"), Language::JavaScript);
        assert_eq!(Language::detect("data.rs"), Language::JavaScript);
    }

    #[test]
    fn unknown_stored_language_deserializes_as_plain_text() {
        let language: Language = serde_json::from_str("\"rust\"").expect("parse");
        assert_eq!(language, Language::PlainText);
        let language: Language = serde_json::from_str("\"cpp\"").expect("parse");
        assert_eq!(language, Language::Cpp);
    }

    #[test]
    fn ids_round_trip_through_from_id() {
        for language in Language::SUPPORTED {
            assert_eq!(Language::from_id(language.id()), Some(language));
        }
        assert_eq!(Language::from_id("JavaScript"), None);
    }
}
