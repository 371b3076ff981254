//! Pagination stage.

use super::Query;
use crate::error::{DepotError, DepotResult};

/// One window of a sequence plus totals of the whole sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationOutput<E> {
    pub query: Query<E>,
    pub pages: usize,
    pub count: usize,
}

impl<E> Query<E> {
    /// Cuts page `page` (1-based) of `range` items.
    ///
    /// `export` skips windowing and reports a single page. A page past the
    /// end yields an empty window.
    ///
    /// # Errors
    /// - `InvalidInput` when `page` or `range` is zero and `export` is off.
    pub fn paginate_view(
        self,
        page: usize,
        range: usize,
        export: bool,
    ) -> DepotResult<PaginationOutput<E>> {
        let count = self.len();
        if export {
            return Ok(PaginationOutput {
                query: self,
                pages: 1,
                count,
            });
        }
        if page == 0 || range == 0 {
            return Err(DepotError::InvalidInput(format!(
                "page and range must be at least 1, got page={page} range={range}"
            )));
        }

        let remainder = count % range;
        let pages = count / range + usize::from(remainder > 0);
        let start = range.saturating_mul(page - 1);
        let length = if page == pages && remainder != 0 {
            remainder
        } else {
            range
        };

        Ok(PaginationOutput {
            query: self.into_iter().skip(start).take(length).collect(),
            pages,
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DepotError;
    use crate::query::Query;

    fn numbers(count: usize) -> Query<usize> {
        (1..=count).collect()
    }

    #[test]
    fn last_page_holds_the_remainder() {
        let output = numbers(25).paginate_view(3, 10, false).unwrap();

        assert_eq!(output.pages, 3);
        assert_eq!(output.count, 25);
        assert_eq!(output.query.into_vec(), vec![21, 22, 23, 24, 25]);
    }

    #[test]
    fn exact_multiple_keeps_full_last_page() {
        let output = numbers(20).paginate_view(2, 10, false).unwrap();

        assert_eq!(output.pages, 2);
        assert_eq!(output.query.len(), 10);
        assert_eq!(output.query.first(), Some(&11));
    }

    #[test]
    fn export_returns_everything_as_one_page() {
        let output = numbers(25).paginate_view(0, 0, true).unwrap();

        assert_eq!(output.pages, 1);
        assert_eq!(output.count, 25);
        assert_eq!(output.query.len(), 25);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let output = numbers(5).paginate_view(4, 2, false).unwrap();

        assert_eq!(output.pages, 3);
        assert!(output.query.is_empty());
    }

    #[test]
    fn zero_page_or_range_is_rejected() {
        assert!(matches!(
            numbers(5).paginate_view(0, 2, false),
            Err(DepotError::InvalidInput(_))
        ));
        assert!(matches!(
            numbers(5).paginate_view(1, 0, false),
            Err(DepotError::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_sequence_has_no_pages() {
        let output = numbers(0).paginate_view(1, 10, false).unwrap();

        assert_eq!(output.pages, 0);
        assert_eq!(output.count, 0);
        assert!(output.query.is_empty());
    }
}
