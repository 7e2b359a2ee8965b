//! Text emission helpers for generated source.

/// Line-oriented writer for generated code blocks.
#[derive(Debug, Default)]
pub struct CodeFormatter {
    output: String,
}

impl CodeFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write text as is.
    pub fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    /// Write a line.
    pub fn writeln(&mut self, s: &str) {
        self.output.push_str(s);
        self.output.push('\n');
    }

    /// Write an empty line.
    pub fn newline(&mut self) {
        self.output.push('\n');
    }

    /// Write a `#ifdef` guarded region. Guards nest.
    pub fn guarded<F: FnOnce(&mut Self)>(&mut self, macro_name: &str, f: F) {
        self.writeln(&format!("#ifdef {}", macro_name));
        f(self);
        self.writeln("#endif");
    }

    /// Get the formatted output.
    pub fn finish(self) -> String {
        self.output
    }
}

/// Format a list with separators using a custom formatter.
pub fn format_list_with<T, F: Fn(&T) -> String>(items: &[T], sep: &str, f: F) -> String {
    items.iter().map(f).collect::<Vec<_>>().join(sep)
}
