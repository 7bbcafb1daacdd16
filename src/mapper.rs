//! Folds flat join rows into nested entities.
//!
//! Joined selects alias every column as `"table.column"`, and each join has a
//! row type deriving `FromRow` with one field per qualified name. The helpers
//! here turn those flat rows into entity graphs:
//!
//! - one-to-one joins (`inventory ⟕ product`, `user ⟕ role`) implement
//!   `From<Row> for Entity` and go through [`first`] / [`all`];
//! - one-to-many joins (`order ⟕ order_item ⟕ product`) implement
//!   [`GroupedRow`] and go through [`group`].

/// A row of a one-to-many join.
///
/// Splits into the parent's key, the parent with its single-valued joins
/// already attached, and the child carried by this row (if the outer join
/// produced one).
pub trait GroupedRow {
    type Key: PartialEq;
    type Parent: HasChildren<Child = Self::Child>;
    type Child;

    fn into_parts(self) -> (Self::Key, Self::Parent, Option<Self::Child>);
}

pub trait HasChildren {
    type Child;

    fn children_mut(&mut self) -> &mut Vec<Self::Child>;
}

/// First row of a one-to-one join, hydrated. `None` for an empty result.
pub fn first<R, E>(rows: impl IntoIterator<Item = R>) -> Option<E>
where
    R: Into<E>,
{
    rows.into_iter().next().map(Into::into)
}

pub fn all<R, E>(rows: impl IntoIterator<Item = R>) -> Vec<E>
where
    R: Into<E>,
{
    rows.into_iter().map(Into::into).collect()
}

/// Streaming group-by over rows sorted by parent key.
///
/// A row whose key equals the previously emitted parent's key appends its
/// child to that parent; any other key starts a new parent. Only adjacent
/// rows are compared, so the query must keep each parent's rows contiguous.
pub fn group<R>(rows: impl IntoIterator<Item = R>) -> Vec<R::Parent>
where
    R: GroupedRow,
{
    let mut parents: Vec<R::Parent> = Vec::new();
    let mut last_key: Option<R::Key> = None;

    for row in rows {
        let (key, parent, child) = row.into_parts();
        let same_parent = last_key.as_ref() == Some(&key);

        if !same_parent {
            parents.push(parent);
            last_key = Some(key);
        }
        if let (Some(child), Some(current)) = (child, parents.last_mut()) {
            current.children_mut().push(child);
        }
    }

    parents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Basket {
        id: i64,
        owner: &'static str,
        fruits: Vec<&'static str>,
    }

    impl HasChildren for Basket {
        type Child = &'static str;

        fn children_mut(&mut self) -> &mut Vec<&'static str> {
            &mut self.fruits
        }
    }

    struct BasketRow(i64, &'static str, Option<&'static str>);

    impl GroupedRow for BasketRow {
        type Key = i64;
        type Parent = Basket;
        type Child = &'static str;

        fn into_parts(self) -> (i64, Basket, Option<&'static str>) {
            let basket = Basket {
                id: self.0,
                owner: self.1,
                fruits: Vec::new(),
            };
            (self.0, basket, self.2)
        }
    }

    #[test]
    fn groups_contiguous_rows_preserving_child_order() {
        let rows = vec![
            BasketRow(7, "ann", Some("apple")),
            BasketRow(7, "ann", Some("pear")),
            BasketRow(7, "ann", Some("fig")),
            BasketRow(2, "bob", Some("kiwi")),
            BasketRow(9, "cy", Some("lime")),
            BasketRow(9, "cy", Some("plum")),
        ];

        let baskets = group(rows);

        assert_eq!(baskets.len(), 3);
        assert_eq!(baskets[0].id, 7);
        assert_eq!(baskets[0].fruits, vec!["apple", "pear", "fig"]);
        assert_eq!(baskets[1].id, 2);
        assert_eq!(baskets[1].fruits, vec!["kiwi"]);
        assert_eq!(baskets[2].owner, "cy");
        assert_eq!(baskets[2].fruits, vec!["lime", "plum"]);
    }

    #[test]
    fn parent_without_child_gets_empty_collection() {
        let baskets = group(vec![BasketRow(1, "dee", None), BasketRow(3, "eve", Some("date"))]);
        assert_eq!(baskets.len(), 2);
        assert!(baskets[0].fruits.is_empty());
        assert_eq!(baskets[1].fruits, vec!["date"]);
    }

    #[test]
    fn non_adjacent_repeats_start_new_parents() {
        let baskets = group(vec![
            BasketRow(1, "a", Some("x")),
            BasketRow(2, "b", Some("y")),
            BasketRow(1, "a", Some("z")),
        ]);
        assert_eq!(baskets.iter().map(|b| b.id).collect::<Vec<_>>(), vec![1, 2, 1]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(group(Vec::<BasketRow>::new()).is_empty());
        assert_eq!(first::<(i64, i64), (i64, i64)>(Vec::new()), None);
        assert!(all::<(i64, i64), (i64, i64)>(Vec::new()).is_empty());
    }

    #[test]
    fn first_takes_only_the_leading_row() {
        let picked: Option<(i64, i64)> = first(vec![(1, 2), (3, 4)]);
        assert_eq!(picked, Some((1, 2)));
    }
}
