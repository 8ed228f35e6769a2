use crate::api::{FilterOptions, FilterSelection};

/// A drop-down style control: server-provided options behind a leading
/// "All" entry whose value is the empty string.
#[derive(Debug, Clone, Default)]
pub struct FilterControl {
    label: &'static str,
    options: Vec<String>,
    // 0 is "All", n is options[n - 1]
    selected: usize,
}

impl FilterControl {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            options: Vec::new(),
            selected: 0,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Add options in the order given, after any already present.
    pub fn add_options<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(entries.into_iter().map(Into::into));
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Value sent to the server: the chosen option, or "" for "All".
    pub fn value(&self) -> &str {
        match self.selected {
            0 => "",
            n => self.options.get(n - 1).map(String::as_str).unwrap_or(""),
        }
    }

    /// Text shown for the current choice.
    pub fn display_value(&self) -> &str {
        match self.value() {
            "" => "All",
            v => v,
        }
    }

    /// Index into the displayed list, where 0 is "All".
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn select_next(&mut self) {
        if self.selected < self.options.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_value(&mut self, value: &str) -> bool {
        if value.is_empty() {
            self.selected = 0;
            return true;
        }
        match self.options.iter().position(|o| o == value) {
            Some(i) => {
                self.selected = i + 1;
                true
            }
            None => false,
        }
    }
}

/// The country and category controls, read together at every submission.
#[derive(Debug, Clone)]
pub struct FilterPanel {
    pub country: FilterControl,
    pub category: FilterControl,
}

impl Default for FilterPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterPanel {
    pub fn new() -> Self {
        Self {
            country: FilterControl::new("Country"),
            category: FilterControl::new("Category"),
        }
    }

    pub fn populate(&mut self, options: FilterOptions) {
        if let Some(countries) = options.countries {
            self.country.add_options(countries);
        }
        if let Some(categories) = options.categories {
            self.category.add_options(categories);
        }
    }

    pub fn selection(&self) -> FilterSelection {
        FilterSelection {
            country: self.country.value().to_string(),
            category: self.category.value().to_string(),
        }
    }
}
