//! User-facing CLI errors
//!
//! A [`HelpfulError`] says what failed, optionally why, and lists `TRY:` lines
//! the user can act on. It travels inside `anyhow::Error` and is recovered by
//! downcasting when the error is printed as JSON.

use std::fmt;

#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    pub context: Option<String>,
    /// Each line starts with `TRY:`
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions
            .extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Constructors for common failures ===

    /// A required connection setting was not provided anywhere
    pub fn missing_setting(name: &str, flag: &str, env_var: &str) -> Self {
        Self::new(format!("Missing setting: {}", name))
            .with_context("Connection settings come from flags, environment variables, or the config file")
            .with_suggestions([
                format!("TRY: Pass it on the command line: refaudit scan {} <VALUE>", flag),
                format!("TRY: Export it: export {}=<VALUE>", env_var),
                format!(
                    "TRY: Add `{} = \"...\"` to {}",
                    name,
                    refaudit_protocol::paths::default_config_path().display()
                ),
            ])
    }

    /// A setting was provided but cannot be used
    pub fn invalid_setting(name: &str, reason: &str) -> Self {
        Self::new(format!("Invalid setting: {}", name))
            .with_context(reason.to_string())
            .with_suggestion("TRY: Show the resolved configuration: refaudit config")
    }

    /// The requested locale is not configured in the space
    pub fn unknown_locale(locale: &str, available: &[String]) -> Self {
        let err = Self::new(format!("Unknown locale: '{}'", locale))
            .with_context("The locale is not configured in this space environment");
        if available.is_empty() {
            err.with_suggestion("TRY: List configured locales: refaudit locales")
        } else {
            err.with_suggestions([
                format!("TRY: Use one of: {}", available.join(", ")),
                "TRY: Omit --locale to scan the default locale".to_string(),
            ])
        }
    }

    /// The repository could not be read
    pub fn repository_unreachable(operation: &str, reason: &str) -> Self {
        Self::new(format!("Failed to {}", operation))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: Check the space id and environment: refaudit config".to_string(),
                "TRY: Verify the delivery token has access to this environment".to_string(),
                "TRY: Re-run with --verbose for request details".to_string(),
            ])
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;
        if let Some(context) = &self.context {
            writeln!(f, "CONTEXT: {}", context)?;
        }
        if self.suggestions.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        self.suggestions
            .iter()
            .try_for_each(|line| writeln!(f, "  {}", line))
    }
}

impl std::error::Error for HelpfulError {}

/// Print an error as `{"ok": false, "error": {...}}` on stdout
pub fn print_json_error(err: &anyhow::Error) {
    let error = match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => serde_json::json!({
            "message": helpful.message,
            "context": helpful.context,
            "suggestions": helpful.suggestions,
        }),
        None => serde_json::json!({
            "message": err.to_string(),
            "causes": err.chain().skip(1).map(|cause| cause.to_string()).collect::<Vec<_>>(),
        }),
    };
    let payload = serde_json::json!({ "ok": false, "error": error });
    match serde_json::to_string_pretty(&payload) {
        Ok(text) => println!("{}", text),
        Err(_) => eprintln!("{:?}", err),
    }
}
