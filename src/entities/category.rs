// 🏷️ Category - the fixed set offered by the expense form
//
// Stored as free text in the `expenses.category` column.
// The form only ever offers these seven values, in this order;
// the first one is the default after a reset.

use std::fmt;
use std::str::FromStr;

use crate::error::ExpenseError;

// ============================================================================
// CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Food,
    Transportation,
    Rent,
    Shopping,
    Entertainment,
    Bills,
    Other,
}

impl Category {
    /// All categories in form order
    pub const ALL: [Category; 7] = [
        Category::Food,
        Category::Transportation,
        Category::Rent,
        Category::Shopping,
        Category::Entertainment,
        Category::Bills,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transportation => "Transportation",
            Category::Rent => "Rent",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Bills => "Bills",
            Category::Other => "Other",
        }
    }

    /// Position in the form's list
    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|c| c == self)
            .unwrap_or_default()
    }

    /// Next category, wrapping around like a combo box scrolled past the end
    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(&self) -> Self {
        let len = Self::ALL.len();
        Self::ALL[(self.index() + len - 1) % len]
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::ALL[0]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive lookup by name (used by the CLI and CSV import)
impl FromStr for Category {
    type Err = ExpenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ExpenseError::UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_first_category() {
        assert_eq!(Category::default(), Category::Food);
        assert_eq!(Category::default().index(), 0);
    }

    #[test]
    fn test_next_and_previous_wrap() {
        assert_eq!(Category::Food.next(), Category::Transportation);
        assert_eq!(Category::Other.next(), Category::Food);
        assert_eq!(Category::Food.previous(), Category::Other);
        assert_eq!(Category::Bills.previous(), Category::Entertainment);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("food".parse::<Category>().unwrap(), Category::Food);
        assert_eq!(" RENT ".parse::<Category>().unwrap(), Category::Rent);
        assert_eq!(
            "Entertainment".parse::<Category>().unwrap(),
            Category::Entertainment
        );
    }

    #[test]
    fn test_parse_unknown_category() {
        let err = "Taxes".parse::<Category>().unwrap_err();
        assert!(matches!(err, ExpenseError::UnknownCategory(ref name) if name == "Taxes"));
    }

    #[test]
    fn test_display_matches_stored_text() {
        for category in Category::ALL {
            assert_eq!(category.to_string(), category.as_str());
        }
    }
}
