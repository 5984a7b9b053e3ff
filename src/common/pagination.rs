// src/common/pagination.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
// Maior página cujo offset ainda cabe em i64
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

// Parâmetros crus da query string. Valores inválidos caem nos padrões.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
}

impl Pagination {
    pub fn from_params(params: &PageParams) -> Self {
        fn parse(raw: Option<&str>) -> Result<Option<i64>, std::num::ParseIntError> {
            raw.map(|v| v.trim().parse::<i64>()).transpose()
        }

        match (parse(params.page.as_deref()), parse(params.page_size.as_deref())) {
            (Ok(page), Ok(page_size)) => Self {
                page: page.unwrap_or(1).clamp(1, MAX_PAGE),
                page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            },
            // Qualquer valor não numérico: volta tudo para o padrão
            _ => Self::default(),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}
