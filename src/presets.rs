//! Built-in package manifests offered when the configuration lists none.
use std::io::{self, BufRead as _, Write as _};

use crate::config::Manifest;

/// A named starter manifest.
///
/// `system` packages are installed with whichever manager is the OS primary;
/// `casks` only apply when that manager is Homebrew.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    /// Short name shown in the menu.
    pub name: &'static str,
    /// One-line description shown in the menu.
    pub description: &'static str,
    system: &'static [&'static str],
    casks: &'static [&'static str],
    language: &'static [(&'static str, &'static [&'static str])],
}

/// The four presets, in menu order.
pub const PRESETS: [Preset; 4] = [
    Preset {
        name: "generalist",
        description: "everyday command-line tools and an editor",
        system: &["git", "curl", "jq", "ripgrep", "fzf", "tmux"],
        casks: &["visual-studio-code", "iterm2"],
        language: &[("vscode", &["editorconfig.editorconfig"])],
    },
    Preset {
        name: "backend",
        description: "servers, databases and API tooling",
        system: &["git", "jq", "postgresql", "redis", "httpie"],
        casks: &["docker", "visual-studio-code"],
        language: &[
            ("pip", &["virtualenv", "ipython"]),
            ("vscode", &["ms-python.python"]),
        ],
    },
    Preset {
        name: "frontend",
        description: "Node.js toolchain and browser tooling",
        system: &["git", "node", "yarn"],
        casks: &["firefox", "google-chrome", "visual-studio-code"],
        language: &[
            ("npm", &["typescript", "eslint", "prettier"]),
            ("vscode", &["dbaeumer.vscode-eslint", "esbenp.prettier-vscode"]),
        ],
    },
    Preset {
        name: "ops",
        description: "infrastructure, containers and cloud CLIs",
        system: &["git", "jq", "ansible", "terraform", "kubectl", "awscli"],
        casks: &["docker"],
        language: &[("gem", &["bundler"]), ("pip", &["yq"])],
    },
];

impl Preset {
    /// Turn the preset into a manifest keyed by `os_manager`.
    #[must_use]
    pub fn materialize(&self, os_manager: &str) -> Manifest {
        let mut manifest = Manifest::new();
        manifest.add(os_manager, self.system.iter().copied());
        if os_manager == "brew" {
            manifest.add("cask", self.casks.iter().copied());
        }
        for (manager, packages) in self.language {
            manifest.add(manager, packages.iter().copied());
        }
        manifest
    }
}

/// Source of interactive choices.
pub trait Prompt: Send + Sync + std::fmt::Debug {
    /// Show `options` under `prompt` and return the chosen index.
    ///
    /// # Errors
    ///
    /// Returns an error if input cannot be read or is not a valid choice.
    fn select(&self, prompt: &str, options: &[String]) -> io::Result<usize>;
}

/// Numbered menu on stdout, answer read from stdin.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    #[allow(clippy::print_stdout)]
    fn select(&self, prompt: &str, options: &[String]) -> io::Result<usize> {
        println!("\n{prompt}");
        for (i, option) in options.iter().enumerate() {
            println!("  \x1b[1m{}\x1b[0m) {option}", i + 1);
        }
        print!("\nSelect [1-{}]: ", options.len());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        parse_choice(&input, options.len())
    }
}

/// Parse a 1-based menu answer into a 0-based index.
fn parse_choice(input: &str, len: usize) -> io::Result<usize> {
    let choice: usize = input
        .trim()
        .parse()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid selection"))?;

    if choice == 0 || choice > len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "selection out of range",
        ));
    }
    Ok(choice - 1)
}

/// Ask the user to pick one of [`PRESETS`].
///
/// # Errors
///
/// Propagates the prompt's error.
pub fn choose(prompt: &dyn Prompt) -> io::Result<&'static Preset> {
    let options: Vec<String> = PRESETS
        .iter()
        .map(|p| format!("{:<10} {}", p.name, p.description))
        .collect();
    let index = prompt.select("No packages configured. Choose a starting preset:", &options)?;
    PRESETS
        .get(index)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "selection out of range"))
}
