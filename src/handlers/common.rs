use serde::Deserialize;

const DEFAULT_PER_PAGE: u64 = 20;
const MAX_PER_PAGE: u64 = 100;

/// Standard pagination query parameters for list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl PaginationParams {
    /// 1-based page number.
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let p = PaginationParams {
            page: None,
            per_page: None,
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), 20);

        let p = PaginationParams {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), 100);
    }
}
