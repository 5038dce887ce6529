use serde::{Deserialize, Serialize};

use crate::error::{CoopGamesError, Result};

/// Position of a result page within the full result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub page_size: u64,
    pub total_games: u64,
}

impl Pagination {
    /// Derive page numbers from an offset window.
    ///
    /// `next_index` is the index of the first game on the page. With no games
    /// both page numbers are zero; otherwise `current_page` is clamped to
    /// `[1, total_pages]`.
    pub fn from_window(next_index: u64, page_size: u64, total_games: u64) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_games.div_ceil(page_size);
        let current_page = if total_pages == 0 {
            0
        } else {
            (next_index / page_size + 1).clamp(1, total_pages)
        };
        Self {
            current_page,
            total_pages,
            page_size,
            total_games,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_pages > 0 && !(1..=self.total_pages).contains(&self.current_page) {
            return Err(CoopGamesError::InvalidArgument(format!(
                "current_page {} outside 1..={}",
                self.current_page, self.total_pages
            )));
        }
        Ok(())
    }
}
