//! Database access layer for tsf-query
//!
//! Catalog reads only ever see committed refreshes. Favorites and stored quiz
//! results are the only tables this service writes.

pub mod favorites;
pub mod filter;
pub mod programmes;
pub mod questions;
pub mod results;

/// Bind parameter for `json_each(?)` id list lookups
pub(crate) fn id_list(ids: &[i64]) -> String {
    let list: Vec<String> = ids.iter().map(i64::to_string).collect();
    format!("[{}]", list.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_list() {
        assert_eq!(id_list(&[]), "[]");
        assert_eq!(id_list(&[3, 1, 2]), "[3,1,2]");
    }
}
