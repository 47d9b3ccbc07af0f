use clap::ValueEnum;

/// When to use colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Color {
    /// Color when stderr is a terminal that supports it.
    Auto,
    #[allow(missing_docs)]
    Always,
    #[allow(missing_docs)]
    Never,
}

impl Color {
    /// Resolves [`Color::Auto`] against the current stderr.
    pub fn is_enabled(self) -> bool {
        match self {
            Color::Always => true,
            Color::Never => false,
            Color::Auto => supports_color::on(supports_color::Stream::Stderr).is_some(),
        }
    }
}

/// Installs the `color-eyre` panic and error report hooks, colored only when enabled.
pub fn install_color_eyre(color: Color) -> color_eyre::Result<()> {
    if color.is_enabled() {
        color_eyre::install()
    } else {
        // an empty theme disables coloring
        color_eyre::config::HookBuilder::new()
            .theme(color_eyre::config::Theme::new())
            .install()
    }
}
