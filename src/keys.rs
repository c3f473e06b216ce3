//! Cache Keys Module
//!
//! Deterministic key construction for the catalog's query shapes, plus
//! glob patterns for bulk invalidation of every variant of a shape.
//!
//! Keys are flat colon-delimited strings:
//! `app:<entity>:<operation>:<param>=<value>:...:origin=api`. Search
//! queries are normalized and content-hashed so arbitrarily long or
//! special-character text maps to a fixed-width, store-safe token.
//!
//! Which domain events invalidate which patterns is the application's
//! decision; this module only builds the strings and resolves patterns to
//! deletions.

use md5::{Digest, Md5};

use crate::service::CacheService;

/// Leading segment shared by every key this module builds.
pub const NAMESPACE: &str = "app";

/// Trailing segment marking keys minted by the API layer.
const ORIGIN: &str = "origin=api";

// == Book Keys ==
/// Key for a single book looked up by id.
pub fn book_find(id: u64) -> String {
    format!("{NAMESPACE}:book:find:id={id}:{ORIGIN}")
}

/// Key for one page of the paginated book listing.
pub fn book_list(page: u32, per_page: u32) -> String {
    format!("{NAMESPACE}:book:list:page={page}:per={per_page}:{ORIGIN}")
}

/// Pattern matching every cached page of the book listing.
pub fn book_list_pattern() -> String {
    format!("{NAMESPACE}:book:list:*")
}

/// Key for a free-text book search.
///
/// The query is normalized (trimmed, lowercased) before hashing, so
/// `"Foo"` and `" foo "` share one cache entry by design.
pub fn book_search(query: &str) -> String {
    format!("{NAMESPACE}:book:search:q={}:{ORIGIN}", search_token(query))
}

/// Pattern matching every cached search result.
pub fn book_search_pattern() -> String {
    format!("{NAMESPACE}:book:search:*")
}

/// Key for books filtered by a single attribute, e.g. `genre=fiction`.
pub fn book_filter(attribute: &str, value: &str) -> String {
    format!(
        "{NAMESPACE}:book:filter:{attribute}={}:{ORIGIN}",
        normalize(value)
    )
}

/// Pattern matching every cached filter result for `attribute`.
pub fn book_filter_pattern(attribute: &str) -> String {
    format!("{NAMESPACE}:book:filter:{attribute}=*")
}

/// Pattern matching every book-related key.
pub fn all_books_pattern() -> String {
    format!("{NAMESPACE}:book:*")
}

// == Review Keys ==
/// Key for the review listing of one book.
pub fn review_list(book_id: u64) -> String {
    format!("{NAMESPACE}:review:list:book_id={book_id}:{ORIGIN}")
}

/// Pattern matching every cached review listing.
pub fn review_list_pattern() -> String {
    format!("{NAMESPACE}:review:list:*")
}

// == Namespace-Wide ==
/// Pattern matching every key this module can mint.
pub fn all_pattern() -> String {
    format!("{NAMESPACE}:*")
}

// == Pattern Invalidation ==
/// Deletes every key matching `pattern` and returns the count removed.
///
/// Returns 0 without issuing a delete when nothing matches, avoiding a
/// pointless backend round-trip.
pub fn clear_pattern(cache: &CacheService, pattern: &str) -> usize {
    let keys = cache.keys(pattern);
    if keys.is_empty() {
        return 0;
    }
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    cache.delete(&refs)
}

// == Helpers ==
fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Fixed-width one-way token for a normalized search query.
fn search_token(query: &str) -> String {
    format!("{:x}", Md5::digest(normalize(query).as_bytes()))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn memory_service() -> CacheService {
        CacheService::with_backend(Box::new(MemoryBackend::new()))
    }

    #[test]
    fn test_book_find_key_shape() {
        assert_eq!(book_find(42), "app:book:find:id=42:origin=api");
    }

    #[test]
    fn test_book_list_key_and_pattern() {
        let key = book_list(1, 20);
        assert_eq!(key, "app:book:list:page=1:per=20:origin=api");

        let re = crate::backend::glob_to_regex(&book_list_pattern()).unwrap();
        assert!(re.is_match(&key));
        assert!(!re.is_match(&book_find(1)));
    }

    #[test]
    fn test_search_key_is_fixed_width() {
        let short = book_search("x");
        let long = book_search(&"long query ".repeat(50));
        assert_eq!(short.len(), long.len());
    }

    #[test]
    fn test_search_key_normalization_collides() {
        assert_eq!(
            book_search("Ruby Programming"),
            book_search("ruby programming")
        );
        assert_eq!(book_search("  foo  "), book_search("foo"));
        assert_ne!(book_search("foo"), book_search("bar"));
    }

    #[test]
    fn test_filter_key_and_pattern() {
        let key = book_filter("genre", " Fiction ");
        assert_eq!(key, "app:book:filter:genre=fiction:origin=api");

        let re = crate::backend::glob_to_regex(&book_filter_pattern("genre")).unwrap();
        assert!(re.is_match(&key));
        assert!(!re.is_match(&book_filter("author", "fiction")));
    }

    #[test]
    fn test_review_list_key() {
        assert_eq!(review_list(7), "app:review:list:book_id=7:origin=api");
    }

    #[test]
    fn test_clear_pattern_deletes_matches() {
        let cache = memory_service();

        cache.set(&book_list(1, 20), &"page1", None);
        cache.set(&book_list(2, 20), &"page2", None);
        cache.set(&book_find(1), &"book", None);

        let removed = clear_pattern(&cache, &book_list_pattern());
        assert_eq!(removed, 2);
        assert!(cache.exists(&book_find(1)));
    }

    #[test]
    fn test_clear_pattern_empty_match_returns_zero() {
        let cache = memory_service();
        assert_eq!(clear_pattern(&cache, &book_search_pattern()), 0);
    }
}
