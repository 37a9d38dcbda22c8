//! Token-budgeted history selection.

use std::sync::Arc;

use super::filters::{apply_filters, InputFilter};
use super::provider::{gather_contexts, ContextProvider};
use crate::error::StrandError;
use crate::types::Item;

/// Estimates the token cost of one item.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, item: &Item) -> usize;
}

impl<F> TokenEstimator for F
where
    F: Fn(&Item) -> usize + Send + Sync,
{
    fn estimate(&self, item: &Item) -> usize {
        self(item)
    }
}

/// Roughly four characters per token over the item's JSON serialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharEstimator;

impl TokenEstimator for CharEstimator {
    fn estimate(&self, item: &Item) -> usize {
        serde_json::to_string(item)
            .map(|s| s.chars().count().div_ceil(4))
            .unwrap_or(0)
    }
}

/// The longest trailing window of `items` whose total cost fits `budget`.
///
/// Stops at the first item (walking back from the newest) that would exceed
/// the budget; items are never truncated.
pub fn select_within_budget<'a>(
    items: &'a [Item],
    budget: Option<usize>,
    estimator: &dyn TokenEstimator,
) -> &'a [Item] {
    let Some(budget) = budget else {
        return items;
    };
    let mut total = 0usize;
    let mut start = items.len();
    for (index, item) in items.iter().enumerate().rev() {
        match total.checked_add(estimator.estimate(item)) {
            Some(next) if next <= budget => {
                total = next;
                start = index;
            }
            _ => break,
        }
    }
    &items[start..]
}

/// Build the input slice for one request: filter, select within budget,
/// then prepend the rendered context block as a system message.
pub async fn assemble_history(
    log: &[Item],
    filters: &[InputFilter],
    budget: Option<usize>,
    estimator: &dyn TokenEstimator,
    providers: &[Arc<dyn ContextProvider>],
) -> Result<Vec<Item>, StrandError> {
    let filtered = apply_filters(log.to_vec(), filters);
    let selected = select_within_budget(&filtered, budget, estimator);

    let mut input = Vec::with_capacity(selected.len() + 1);
    if let Some(context) = gather_contexts(providers).await? {
        input.push(Item::system(context));
    }
    input.extend_from_slice(selected);
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticContext;
    use pretty_assertions::assert_eq;

    fn five(_: &Item) -> usize {
        5
    }

    #[test]
    fn keeps_the_newest_items_that_fit() {
        let items = vec![Item::user("a"), Item::user("b"), Item::user("c")];
        let selected = select_within_budget(&items, Some(9), &five);
        assert_eq!(selected, &[Item::user("c")]);
    }

    #[test]
    fn stops_at_first_item_over_budget() {
        let costs = |item: &Item| match item.text().as_deref() {
            Some("big") => 50,
            _ => 1,
        };
        let items = vec![Item::user("tiny"), Item::user("big"), Item::user("last")];
        let selected = select_within_budget(&items, Some(10), &costs);
        assert_eq!(selected, &[Item::user("last")]);
    }

    #[test]
    fn huge_estimates_do_not_overflow() {
        let costs = |item: &Item| match item.text().as_deref() {
            Some("huge") => usize::MAX,
            _ => 5,
        };
        let items = vec![Item::user("huge"), Item::user("b")];

        let selected = select_within_budget(&items, Some(usize::MAX), &costs);

        assert_eq!(selected, &items[1..]);
    }

    #[test]
    fn no_budget_keeps_everything() {
        let items = vec![Item::user("a"), Item::user("b")];
        assert_eq!(select_within_budget(&items, None, &five), items.as_slice());
    }

    #[test]
    fn zero_budget_selects_nothing() {
        let items = vec![Item::user("a")];
        assert!(select_within_budget(&items, Some(0), &five).is_empty());
    }

    #[test]
    fn char_estimator_rounds_up() {
        let item = Item::user("hello");
        let json_len = serde_json::to_string(&item).unwrap().len();
        assert_eq!(CharEstimator.estimate(&item), json_len.div_ceil(4));
    }

    #[tokio::test]
    async fn context_block_is_prepended_outside_the_budget() {
        let providers: Vec<Arc<dyn ContextProvider>> =
            vec![Arc::new(StaticContext::new("Profile", "vip"))];
        let log = vec![Item::user("a"), Item::user("b")];

        let input = assemble_history(&log, &[], Some(5), &five, &providers)
            .await
            .unwrap();

        assert_eq!(
            input,
            vec![Item::system("**Profile:**\n```vip```"), Item::user("b")]
        );
    }
}
