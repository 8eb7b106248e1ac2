/// Per-row decision made by [`RowClassifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowClass<K> {
    /// Header, column-number stub, blank or unrecognisable row.
    Skip,
    /// Row that establishes a new key.
    Primary(K),
    /// Row without a leading key; inherits the current one.
    Continuation(K),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierState<K> {
    SeekingKey,
    InGroup(K),
}

/// Carries the last valid key across rows (and across table chunks, so a
/// group split over a page break stays one group).
#[derive(Debug, Clone)]
pub struct RowClassifier<K> {
    state: ClassifierState<K>,
    skip: fn(&str) -> bool,
}

impl<K: Clone> RowClassifier<K> {
    pub fn new(skip: fn(&str) -> bool) -> Self {
        RowClassifier {
            state: ClassifierState::SeekingKey,
            skip,
        }
    }

    pub fn state(&self) -> &ClassifierState<K> {
        &self.state
    }

    /// Classify one row from its leading cell. `parse_key` turns a
    /// non-empty leading cell into a key; `None` marks the row as noise and
    /// leaves the current key untouched.
    pub fn classify<F>(&mut self, leading: &str, has_data: bool, parse_key: F) -> RowClass<K>
    where
        F: FnOnce(&str) -> Option<K>,
    {
        let leading = leading.trim();
        if !has_data || (!leading.is_empty() && (self.skip)(leading)) {
            return RowClass::Skip;
        }

        if leading.is_empty() {
            return match &self.state {
                ClassifierState::InGroup(key) => RowClass::Continuation(key.clone()),
                ClassifierState::SeekingKey => RowClass::Skip,
            };
        }

        match parse_key(leading) {
            Some(key) => {
                self.state = ClassifierState::InGroup(key.clone());
                RowClass::Primary(key)
            }
            None => RowClass::Skip,
        }
    }
}

/// Column-number stub rows: `1`, `a`, `1 2 3 4 5 6`, `7 8 9 10 11 12`.
/// A lone token only counts when it is the first column (`1` or `a`).
pub fn is_column_stub(text: &str) -> bool {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let ordinals: Option<Vec<u32>> = tokens
        .iter()
        .map(|t| match t.as_bytes() {
            [c @ b'a'..=b'z'] => Some(u32::from(c - b'a') + 1),
            _ => t.parse::<u32>().ok().filter(|n| n.to_string() == *t),
        })
        .collect();
    let Some(ordinals) = ordinals else {
        return false;
    };
    let consecutive = ordinals.windows(2).all(|w| w[1] == w[0] + 1);
    match ordinals.first() {
        None => false,
        Some(&first) => consecutive && (first == 1 || ordinals.len() >= 3),
    }
}
