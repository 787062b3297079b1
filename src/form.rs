// Pending input fields of the expense form.
//
// Holds what the user has typed but not submitted yet. The date and the
// category behave like a date picker and a combo box (stepped, never free
// text); amount and description are plain text boxes.

use chrono::{Days, Local, NaiveDate};

use crate::db::{parse_amount, NewExpense};
use crate::entities::Category;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Date,
    Category,
    Amount,
    Description,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Date, Field::Category, Field::Amount, Field::Description];

    pub fn label(&self) -> &'static str {
        match self {
            Field::Date => "Date",
            Field::Category => "Category",
            Field::Amount => "Amount",
            Field::Description => "Description",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Field::Date => Field::Category,
            Field::Category => Field::Amount,
            Field::Amount => Field::Description,
            Field::Description => Field::Date,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Field::Date => Field::Description,
            Field::Category => Field::Date,
            Field::Amount => Field::Category,
            Field::Description => Field::Amount,
        }
    }

    /// Text fields accept typed characters; the others are stepped
    pub fn is_text(&self) -> bool {
        matches!(self, Field::Amount | Field::Description)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseForm {
    pub date: NaiveDate,
    pub category: Category,
    pub amount: String,
    pub description: String,
    pub focus: Field,
}

impl ExpenseForm {
    /// Blank form dated today
    pub fn new() -> Self {
        Self::with_date(Local::now().date_naive())
    }

    pub fn with_date(date: NaiveDate) -> Self {
        Self {
            date,
            category: Category::default(),
            amount: String::new(),
            description: String::new(),
            focus: Field::Date,
        }
    }

    /// Back to defaults after a submit: today, first category, empty text.
    /// Focus is left where it was.
    pub fn reset(&mut self) {
        self.reset_to(Local::now().date_naive());
    }

    pub fn reset_to(&mut self, today: NaiveDate) {
        self.date = today;
        self.category = Category::default();
        self.amount.clear();
        self.description.clear();
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_previous(&mut self) {
        self.focus = self.focus.previous();
    }

    /// Step the focused date/category forward. No effect on text fields.
    pub fn increment(&mut self) {
        match self.focus {
            Field::Date => {
                if let Some(d) = self.date.checked_add_days(Days::new(1)) {
                    self.date = d;
                }
            }
            Field::Category => self.category = self.category.next(),
            Field::Amount | Field::Description => {}
        }
    }

    pub fn decrement(&mut self) {
        match self.focus {
            Field::Date => {
                if let Some(d) = self.date.checked_sub_days(Days::new(1)) {
                    self.date = d;
                }
            }
            Field::Category => self.category = self.category.previous(),
            Field::Amount | Field::Description => {}
        }
    }

    pub fn input_char(&mut self, c: char) {
        match self.focus {
            Field::Amount => self.amount.push(c),
            Field::Description => self.description.push(c),
            Field::Date | Field::Category => {}
        }
    }

    pub fn backspace(&mut self) {
        match self.focus {
            Field::Amount => {
                self.amount.pop();
            }
            Field::Description => {
                self.description.pop();
            }
            Field::Date | Field::Category => {}
        }
    }

    /// Current value of a field as the form shows it
    pub fn display_value(&self, field: Field) -> String {
        match field {
            Field::Date => self.date.format(crate::db::DATE_FORMAT).to_string(),
            Field::Category => self.category.to_string(),
            Field::Amount => self.amount.clone(),
            Field::Description => self.description.clone(),
        }
    }

    /// Validate the pending fields into an insertable expense.
    ///
    /// Only the amount can be wrong: date and category cannot leave their sets.
    pub fn to_new_expense(&self) -> Result<NewExpense> {
        Ok(NewExpense::new(
            self.date,
            self.category,
            parse_amount(&self.amount)?,
            self.description.clone(),
        ))
    }
}

impl Default for ExpenseForm {
    fn default() -> Self {
        Self::new()
    }
}
