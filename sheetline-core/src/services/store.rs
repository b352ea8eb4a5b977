//! Store service - maintains the store directory
//!
//! Imports never create stores; operators seed the directory here, one
//! store at a time or from a store list (CSV or workbook) whose first row
//! names the columns.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::adapters::workbook;
use crate::domain::{RawSheet, Store, StoreStatus};
use crate::ingest::header::normalize_row;

const NUMBER_KEYWORDS: &[&str] = &["número", "numero", "código", "codigo", "number", "loja", "store"];
const NAME_KEYWORDS: &[&str] = &["nome", "name"];
const CITY_KEYWORDS: &[&str] = &["cidade", "city"];
const STATUS_KEYWORDS: &[&str] = &["status", "situação", "situacao"];

/// Result of importing a store list
#[derive(Debug, Default, Serialize)]
pub struct StoreImportResult {
    /// Stores inserted or updated
    pub imported: usize,
    pub skipped: usize,
    /// One line per skipped row
    pub errors: Vec<String>,
}

pub struct StoreService {
    repository: Arc<DuckDbRepository>,
}

impl StoreService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn list_stores(&self) -> Result<Vec<Store>> {
        self.repository.get_stores()
    }

    /// Add a store, or update the one with the same number
    pub fn add_store(
        &self,
        number: &str,
        name: &str,
        city: Option<&str>,
        status: StoreStatus,
    ) -> Result<Store> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Store name cannot be empty");
        }

        let mut store = Store::new(Uuid::new_v4(), number, name).with_status(status);
        if let Some(city) = city.map(str::trim).filter(|c| !c.is_empty()) {
            store = store.with_city(city);
        }
        self.repository.upsert_store(&store)
    }

    /// Import a store list file
    pub async fn import_file(&self, path: &Path) -> Result<StoreImportResult> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        self.import_bytes(&bytes)
    }

    pub fn import_bytes(&self, bytes: &[u8]) -> Result<StoreImportResult> {
        let sheet = workbook::read_sheet(bytes)?;
        let columns = StoreColumns::from_header(&sheet)?;

        let mut result = StoreImportResult::default();
        for row in 1..sheet.len() {
            let cells = sheet.row(row).unwrap_or_default();
            if cells.iter().all(|c| c.is_empty()) {
                continue;
            }

            let text = |col: Option<usize>| {
                col.map(|c| sheet.cell(row, c).as_text().trim().to_string())
                    .filter(|s| !s.is_empty())
            };

            let number = text(Some(columns.number)).unwrap_or_default();
            let name = text(Some(columns.name)).unwrap_or_default();
            let city = text(columns.city);
            let status = match text(columns.status) {
                Some(s) => match StoreStatus::from_str(&s) {
                    Ok(status) => status,
                    Err(e) => {
                        result.skipped += 1;
                        result.errors.push(format!("row {}: {}", row + 1, e));
                        continue;
                    }
                },
                None => StoreStatus::Active,
            };

            match self.add_store(&number, &name, city.as_deref(), status) {
                Ok(_) => result.imported += 1,
                Err(e) => {
                    result.skipped += 1;
                    result.errors.push(format!("row {}: {}", row + 1, e));
                }
            }
        }

        Ok(result)
    }
}

/// Column positions of a store list
struct StoreColumns {
    number: usize,
    name: usize,
    city: Option<usize>,
    status: Option<usize>,
}

impl StoreColumns {
    fn from_header(sheet: &RawSheet) -> Result<Self> {
        let headers = normalize_row(sheet, 0);
        let find = |keywords: &[&str], taken: &[usize]| {
            keywords.iter().find_map(|k| {
                headers
                    .iter()
                    .enumerate()
                    .position(|(i, h)| !taken.contains(&i) && !h.is_empty() && h.contains(k))
            })
        };

        // Name first: "nome da loja" must not be taken for the number
        let Some(name) = find(NAME_KEYWORDS, &[]) else {
            bail!("Store list has no name column (expected one of: {})", NAME_KEYWORDS.join(", "));
        };
        let Some(number) = find(NUMBER_KEYWORDS, &[name]) else {
            bail!(
                "Store list has no number column (expected one of: {})",
                NUMBER_KEYWORDS.join(", ")
            );
        };
        let city = find(CITY_KEYWORDS, &[name, number]);
        let status = find(STATUS_KEYWORDS, &[name, number]);

        Ok(Self {
            number,
            name,
            city,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service() -> (TempDir, StoreService) {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(DuckDbRepository::new(&dir.path().join("test.duckdb")).unwrap());
        repo.ensure_schema().unwrap();
        (dir, StoreService::new(repo))
    }

    #[test]
    fn test_add_store_normalizes_number() {
        let (_dir, service) = service();
        let store = service
            .add_store("Loja 007", "Centro", Some("Recife"), StoreStatus::Active)
            .unwrap();
        assert_eq!(store.number, "7");

        let stores = service.list_stores().unwrap();
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].city.as_deref(), Some("Recife"));
    }

    #[test]
    fn test_add_store_twice_keeps_id() {
        let (_dir, service) = service();
        let first = service
            .add_store("12", "Norte", None, StoreStatus::Active)
            .unwrap();
        let second = service
            .add_store("012", "Norte Shopping", None, StoreStatus::Inactive)
            .unwrap();

        assert_eq!(first.id, second.id);
        let stores = service.list_stores().unwrap();
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].name, "Norte Shopping");
        assert_eq!(stores[0].status, StoreStatus::Inactive);
    }

    #[test]
    fn test_add_store_rejects_blank_name() {
        let (_dir, service) = service();
        assert!(service.add_store("1", "  ", None, StoreStatus::Active).is_err());
        assert!(service.add_store("", "Sem número", None, StoreStatus::Active).is_err());
    }

    #[test]
    fn test_import_store_list() {
        let (_dir, service) = service();
        let csv = "Número;Nome da loja;Cidade;Status\n\
                   001;Centro;Recife;ativa\n\
                   002;Boa Viagem;;inativa\n\
                   ;Sem número;Olinda;ativa\n\
                   004;Casa Forte;Recife;fechada\n\
                   ;;;\n";

        let result = service.import_bytes(csv.as_bytes()).unwrap();
        assert_eq!(result.imported, 2);
        assert_eq!(result.skipped, 2);
        assert_eq!(result.errors.len(), 2);

        let stores = service.list_stores().unwrap();
        assert_eq!(stores[0].number, "1");
        assert_eq!(stores[1].status, StoreStatus::Inactive);
        assert_eq!(stores[1].city, None);
    }

    #[test]
    fn test_import_store_list_without_name_column() {
        let (_dir, service) = service();
        assert!(service.import_bytes("Loja;Cidade\n1;Recife\n".as_bytes()).is_err());
    }
}
