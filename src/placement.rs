//! Choosing which account receives a new file.

use crate::catalog::Catalog;
use crate::{MegapoolError, Result};

/// Picks the account with the most free space for an object of `size` bytes.
///
/// Accounts are scanned in catalog order and the first one with the
/// strictly largest free space wins. Which of several equally free
/// accounts is chosen is not part of the contract.
///
/// # Errors
///
/// Returns [`MegapoolError::InsufficientCapacity`] if no account has any
/// free space or the largest free space is smaller than `size`.
///
/// # Example
///
/// ```
/// use megapool::catalog::{AccountEntry, Catalog};
/// use megapool::placement::choose_account;
///
/// let catalog = Catalog::from_entries([
///     ("alice".to_string(), AccountEntry { free_bytes: 100, ..Default::default() }),
///     ("bob".to_string(), AccountEntry { free_bytes: 50, ..Default::default() }),
/// ]);
///
/// assert_eq!(choose_account(&catalog, 60).unwrap(), "alice");
/// assert!(choose_account(&catalog, 101).is_err());
/// ```
pub fn choose_account(catalog: &Catalog, size: u64) -> Result<&str> {
    pick(catalog, size, None)
}

/// Like [`choose_account`], but never picks `excluded`.
///
/// Used when replacing a file: megaput cannot overwrite, so the new copy
/// has to land on a different account than the old one.
pub fn choose_account_excluding<'a>(
    catalog: &'a Catalog,
    size: u64,
    excluded: &str,
) -> Result<&'a str> {
    pick(catalog, size, Some(excluded))
}

fn pick<'a>(catalog: &'a Catalog, size: u64, excluded: Option<&str>) -> Result<&'a str> {
    let mut best: Option<&str> = None;
    let mut best_free = 0u64;

    for (username, entry) in catalog.entries() {
        if Some(username) == excluded {
            continue;
        }
        if entry.free_bytes > best_free {
            best_free = entry.free_bytes;
            best = Some(username);
        }
    }

    match best {
        Some(username) if best_free >= size => Ok(username),
        _ => Err(MegapoolError::InsufficientCapacity {
            needed: size,
            available: best_free,
        }),
    }
}
