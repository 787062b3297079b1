// Form Controller
//
// Mediates between the pending form fields and the expense store, and keeps
// the displayed table in sync: every mutation is followed by a full reload.
//
// Delete is two-step because the display surface has to ask the user first:
//   Idle --delete_expenses()--> ConfirmDelete { id } --resolve_delete(yes/no)--> Idle

use tracing::{info, warn};

use crate::db::{Expense, ExpenseStore};
use crate::error::{ExpenseError, Result};
use crate::form::ExpenseForm;

/// Column headers of the expense table, in display order
pub const TABLE_HEADERS: [&str; 5] = ["Id", "Date", "Category", "Amount", "Description"];

/// One displayed row: the cells as text, plus what they were rendered from.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub id: String,
    pub date: String,
    pub category: String,
    pub amount: String,
    pub description: String,
    expense_id: i64,
    amount_value: Option<f64>,
}

impl TableRow {
    pub fn cells(&self) -> [&str; 5] {
        [
            &self.id,
            &self.date,
            &self.category,
            &self.amount,
            &self.description,
        ]
    }

    pub fn expense_id(&self) -> i64 {
        self.expense_id
    }
}

impl From<Expense> for TableRow {
    fn from(expense: Expense) -> Self {
        Self {
            id: expense.id.to_string(),
            expense_id: expense.id,
            amount: expense.amount.to_string(),
            amount_value: expense.amount.as_f64(),
            date: expense.date,
            category: expense.category,
            description: expense.description,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    /// Waiting for the user to confirm deleting this expense
    ConfirmDelete { id: i64 },
}

pub struct FormController {
    store: ExpenseStore,
    pub form: ExpenseForm,
    rows: Vec<TableRow>,
    selected: Option<usize>,
    state: ControllerState,
}

impl FormController {
    /// Take ownership of the store and show its current contents.
    pub fn new(store: ExpenseStore) -> Result<Self> {
        Self::with_form(store, ExpenseForm::new())
    }

    pub fn with_form(store: ExpenseStore, form: ExpenseForm) -> Result<Self> {
        let mut controller = Self {
            store,
            form,
            rows: Vec::new(),
            selected: None,
            state: ControllerState::Idle,
        };
        controller.load_table()?;
        Ok(controller)
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn store(&self) -> &ExpenseStore {
        &self.store
    }

    /// Hand the store back for an explicit close at shutdown
    pub fn into_store(self) -> ExpenseStore {
        self.store
    }

    // ========================================================================
    // COMMANDS
    // ========================================================================

    /// Replace the displayed rows with a fresh read of the whole table.
    pub fn load_table(&mut self) -> Result<()> {
        self.rows = self
            .store
            .list_all()?
            .into_iter()
            .map(TableRow::from)
            .collect();

        self.selected = match (self.selected, self.rows.len()) {
            (_, 0) => None,
            (Some(i), len) => Some(i.min(len - 1)),
            (None, _) => None,
        };

        Ok(())
    }

    /// Submit the pending fields, reset the form and refresh.
    ///
    /// A non-numeric amount is rejected before the store is touched and the
    /// fields are kept so the user can correct them.
    pub fn add_expenses(&mut self) -> Result<i64> {
        let expense = match self.form.to_new_expense() {
            Ok(expense) => expense,
            Err(e) => {
                warn!(error = %e, "expense rejected");
                return Err(e);
            }
        };

        let id = self.store.insert(&expense)?;
        self.form.reset();
        self.load_table()?;

        Ok(id)
    }

    /// Ask to delete the selected row. Fails with `NoSelection` when nothing is
    /// selected; otherwise waits for `resolve_delete`.
    pub fn delete_expenses(&mut self) -> Result<i64> {
        let Some(row) = self.selected_row() else {
            warn!("delete requested with no expense selected");
            return Err(ExpenseError::NoSelection);
        };

        let id = row.expense_id();
        self.state = ControllerState::ConfirmDelete { id };

        Ok(id)
    }

    /// Answer the pending confirmation. Returns the deleted id, if any.
    pub fn resolve_delete(&mut self, confirmed: bool) -> Result<Option<i64>> {
        let ControllerState::ConfirmDelete { id } = self.state else {
            return Ok(None);
        };
        self.state = ControllerState::Idle;

        if !confirmed {
            info!(id, "delete cancelled");
            return Ok(None);
        }

        self.store.delete(id)?;
        self.load_table()?;

        Ok(Some(id))
    }

    // ========================================================================
    // SELECTION
    // ========================================================================

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_row(&self) -> Option<&TableRow> {
        self.selected.and_then(|i| self.rows.get(i))
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.selected = index.filter(|i| *i < self.rows.len());
    }

    pub fn select_next(&mut self) {
        let len = self.rows.len();
        if len == 0 {
            return;
        }
        let i = match self.selected {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.selected = Some(i);
    }

    pub fn select_previous(&mut self) {
        let len = self.rows.len();
        if len == 0 {
            return;
        }
        let i = match self.selected {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => len - 1,
        };
        self.selected = Some(i);
    }

    pub fn select_first(&mut self) {
        self.select(Some(0));
    }

    pub fn select_last(&mut self) {
        self.select(self.rows.len().checked_sub(1));
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Sum of the displayed amounts that are numeric
    pub fn total_amount(&self) -> f64 {
        self.rows.iter().filter_map(|r| r.amount_value).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewExpense;
    use crate::entities::Category;
    use crate::form::Field;
    use chrono::{Local, NaiveDate};

    fn controller() -> FormController {
        let store = ExpenseStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        FormController::with_form(
            store,
            ExpenseForm::with_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
        )
        .unwrap()
    }

    fn fill(controller: &mut FormController, amount: &str, description: &str) {
        controller.form.amount = amount.to_string();
        controller.form.description = description.to_string();
    }

    #[test]
    fn test_add_expense_refreshes_table() {
        let mut controller = controller();
        fill(&mut controller, "12.50", "lunch");

        let id = controller.add_expenses().unwrap();

        assert_eq!(id, 1);
        assert_eq!(
            controller.rows()[0].cells(),
            ["1", "2024-01-15", "Food", "12.50", "lunch"]
        );
    }

    #[test]
    fn test_add_expense_resets_form() {
        let mut controller = controller();
        controller.form.category = Category::Shopping;
        controller.form.focus = Field::Amount;
        fill(&mut controller, "30", "shoes");

        controller.add_expenses().unwrap();

        assert_eq!(controller.form.date, Local::now().date_naive());
        assert_eq!(controller.form.category, Category::Food);
        assert_eq!(controller.form.amount, "");
        assert_eq!(controller.form.description, "");
        assert_eq!(controller.rows()[0].category, "Shopping");
    }

    #[test]
    fn test_invalid_amount_keeps_fields_and_store() {
        let mut controller = controller();
        fill(&mut controller, "", "forgot the amount");

        let err = controller.add_expenses().unwrap_err();

        assert!(matches!(err, ExpenseError::InvalidAmount(_)));
        assert_eq!(controller.form.description, "forgot the amount");
        assert_eq!(controller.store().count().unwrap(), 0);
        assert!(controller.rows().is_empty());
    }

    #[test]
    fn test_delete_without_selection_warns_and_keeps_rows() {
        let mut controller = controller();
        fill(&mut controller, "5", "coffee");
        controller.add_expenses().unwrap();
        controller.clear_selection();

        let err = controller.delete_expenses().unwrap_err();

        assert!(matches!(err, ExpenseError::NoSelection));
        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(controller.store().count().unwrap(), 1);
    }

    #[test]
    fn test_delete_confirmed_removes_selected_row() {
        let mut controller = controller();
        fill(&mut controller, "5", "coffee");
        let first = controller.add_expenses().unwrap();
        fill(&mut controller, "7", "bagel");
        let second = controller.add_expenses().unwrap();

        controller.select_first();
        assert_eq!(controller.delete_expenses().unwrap(), first);
        assert_eq!(controller.state(), ControllerState::ConfirmDelete { id: first });

        assert_eq!(controller.resolve_delete(true).unwrap(), Some(first));

        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(controller.rows().len(), 1);
        assert_eq!(controller.rows()[0].id, second.to_string());
        assert_eq!(controller.selected(), Some(0));
    }

    #[test]
    fn test_delete_declined_takes_no_action() {
        let mut controller = controller();
        fill(&mut controller, "5", "coffee");
        controller.add_expenses().unwrap();
        controller.select_first();

        controller.delete_expenses().unwrap();
        assert_eq!(controller.resolve_delete(false).unwrap(), None);

        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(controller.rows().len(), 1);
    }

    #[test]
    fn test_resolve_without_pending_delete_is_noop() {
        let mut controller = controller();
        assert_eq!(controller.resolve_delete(true).unwrap(), None);
    }

    #[test]
    fn test_load_table_picks_up_external_changes() {
        let mut controller = controller();
        controller
            .store()
            .insert(&NewExpense::new(
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                Category::Rent,
                850.0,
                "february",
            ))
            .unwrap();
        assert!(controller.rows().is_empty());

        controller.load_table().unwrap();

        assert_eq!(controller.rows().len(), 1);
        assert_eq!(controller.rows()[0].amount, "850.00");
    }

    #[test]
    fn test_selection_wraps_and_clamps() {
        let mut controller = controller();
        assert_eq!(controller.selected(), None);
        controller.select_next();
        assert_eq!(controller.selected(), None, "empty table has nothing to select");

        for amount in ["1", "2", "3"] {
            fill(&mut controller, amount, "");
            controller.add_expenses().unwrap();
        }

        controller.select_previous();
        assert_eq!(controller.selected(), Some(2));
        controller.select_next();
        assert_eq!(controller.selected(), Some(0));

        // Deleting the last row moves the selection up
        controller.select_last();
        controller.delete_expenses().unwrap();
        controller.resolve_delete(true).unwrap();
        assert_eq!(controller.selected(), Some(1));
    }

    #[test]
    fn test_total_amount() {
        let mut controller = controller();
        for amount in ["12.50", "7.25"] {
            fill(&mut controller, amount, "");
            controller.add_expenses().unwrap();
        }

        assert_eq!(controller.total_amount(), 19.75);
    }
}
