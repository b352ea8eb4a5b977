//! Import schemas and their keyword vocabulary
//!
//! Each schema is a fixed set of semantic fields. A field is found in a
//! worksheet by substring-matching lowercase header cells against an
//! ordered keyword list; earlier keywords win over later ones.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::Error;

/// The two ingestion flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportSchema {
    /// Monthly sales-by-store actuals
    Performance,
    /// Brand/category sales by store
    Product,
}

impl ImportSchema {
    pub const ALL: [ImportSchema; 2] = [ImportSchema::Performance, ImportSchema::Product];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportSchema::Performance => "performance",
            ImportSchema::Product => "product",
        }
    }

    /// Fields in mapping order, with their built-in keywords
    pub fn field_specs(&self) -> &'static [FieldSpec] {
        match self {
            ImportSchema::Performance => PERFORMANCE_FIELDS,
            ImportSchema::Product => PRODUCT_FIELDS,
        }
    }

    /// Rules a header mapping must satisfy
    pub fn required(&self) -> &'static [Required] {
        match self {
            ImportSchema::Performance => &[
                Required::Field(SemanticField::Store),
                Required::Field(SemanticField::Revenue),
            ],
            ImportSchema::Product => &[
                Required::Field(SemanticField::Store),
                Required::Field(SemanticField::Brand),
                Required::AnyOf(&[SemanticField::Units, SemanticField::Revenue]),
            ],
        }
    }

    /// Fields whose keywords identify a header row; a row needs a hit in
    /// every group
    fn header_groups(&self) -> &'static [&'static [SemanticField]] {
        match self {
            ImportSchema::Performance => &[
                &[SemanticField::Store],
                &[
                    SemanticField::Revenue,
                    SemanticField::Units,
                    SemanticField::SalesCount,
                ],
            ],
            ImportSchema::Product => &[&[SemanticField::Store], &[SemanticField::Brand]],
        }
    }

    /// Keyword table with built-in keywords only
    pub fn keyword_table(&self) -> KeywordTable {
        KeywordTable::new(*self, &HashMap::new())
    }
}

impl fmt::Display for ImportSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportSchema {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "performance" | "performance-actual" | "actuals" => Ok(ImportSchema::Performance),
            "product" | "product-performance" | "products" => Ok(ImportSchema::Product),
            other => Err(Error::validation(format!(
                "Unknown import schema '{}', expected 'performance' or 'product'",
                other
            ))),
        }
    }
}

/// Semantic fields a column can feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    Store,
    Brand,
    Category,
    Units,
    Revenue,
    SalesCount,
    Period,
}

impl SemanticField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticField::Store => "store",
            SemanticField::Brand => "brand",
            SemanticField::Category => "category",
            SemanticField::Units => "units",
            SemanticField::Revenue => "revenue",
            SemanticField::SalesCount => "sales_count",
            SemanticField::Period => "period",
        }
    }
}

impl fmt::Display for SemanticField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "store" => Ok(SemanticField::Store),
            "brand" => Ok(SemanticField::Brand),
            "category" => Ok(SemanticField::Category),
            "units" => Ok(SemanticField::Units),
            "revenue" => Ok(SemanticField::Revenue),
            "sales_count" | "salescount" => Ok(SemanticField::SalesCount),
            "period" => Ok(SemanticField::Period),
            other => Err(Error::validation(format!("Unknown field: {}", other))),
        }
    }
}

/// Required-column rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Required {
    Field(SemanticField),
    AnyOf(&'static [SemanticField]),
}

impl Required {
    pub fn is_satisfied(&self, map: &FieldMap) -> bool {
        match self {
            Required::Field(field) => map.get(*field).is_some(),
            Required::AnyOf(fields) => fields.iter().any(|f| map.get(*f).is_some()),
        }
    }

    /// Name shown to the operator when the rule fails
    pub fn describe(&self) -> String {
        match self {
            Required::Field(field) => field.to_string(),
            Required::AnyOf(fields) => fields
                .iter()
                .map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join(" or "),
        }
    }
}

/// Built-in keywords for one field
#[derive(Debug)]
pub struct FieldSpec {
    pub field: SemanticField,
    pub keywords: &'static [&'static str],
}

// Code-style headers come first: "Nome da Loja" also contains "loja".
const STORE_KEYWORDS: &[&str] = &[
    "cód. loja",
    "cod. loja",
    "cód loja",
    "cod loja",
    "código da loja",
    "codigo da loja",
    "código loja",
    "codigo loja",
    "nº loja",
    "n° loja",
    "número da loja",
    "numero da loja",
    "cód. filial",
    "cod. filial",
    "loja",
    "filial",
    "unidade",
    "store",
];

const PERIOD_KEYWORDS: &[&str] = &[
    "período",
    "periodo",
    "competência",
    "competencia",
    "mês/ano",
    "mes/ano",
    "mês",
    "data",
];

const PERFORMANCE_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: SemanticField::Store,
        keywords: STORE_KEYWORDS,
    },
    FieldSpec {
        field: SemanticField::SalesCount,
        keywords: &[
            "qtd vendas",
            "qtd. vendas",
            "nº vendas",
            "n° vendas",
            "número de vendas",
            "numero de vendas",
            "atendimentos",
            "cupons",
            "tickets",
        ],
    },
    FieldSpec {
        field: SemanticField::Units,
        keywords: &[
            "qtd itens",
            "qtd. itens",
            "itens",
            "peças",
            "pecas",
            "unidades",
            "quantidade",
            "qtd",
        ],
    },
    FieldSpec {
        field: SemanticField::Revenue,
        keywords: &[
            "valor vendido",
            "total vendido",
            "faturamento",
            "receita",
            "vendido",
            "valor",
            "total",
        ],
    },
    FieldSpec {
        field: SemanticField::Period,
        keywords: PERIOD_KEYWORDS,
    },
];

const PRODUCT_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: SemanticField::Store,
        keywords: STORE_KEYWORDS,
    },
    FieldSpec {
        field: SemanticField::Brand,
        keywords: &["marca", "fabricante", "brand"],
    },
    FieldSpec {
        field: SemanticField::Category,
        keywords: &["categoria", "departamento", "segmento", "grupo"],
    },
    FieldSpec {
        field: SemanticField::Units,
        keywords: &[
            "qtd vendida",
            "quantidade",
            "unidades",
            "peças",
            "pecas",
            "itens",
            "qtd",
        ],
    },
    FieldSpec {
        field: SemanticField::Revenue,
        keywords: &[
            "valor vendido",
            "total vendido",
            "faturamento",
            "receita",
            "vendido",
            "valor",
            "total",
        ],
    },
    FieldSpec {
        field: SemanticField::Period,
        keywords: PERIOD_KEYWORDS,
    },
];

/// Resolved keyword vocabulary for one schema
///
/// Starts from the built-in keywords and appends operator-configured
/// extras per field.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    pub schema: ImportSchema,
    fields: Vec<(SemanticField, Vec<String>)>,
}

impl KeywordTable {
    pub fn new(schema: ImportSchema, extra: &HashMap<SemanticField, Vec<String>>) -> Self {
        let fields = schema
            .field_specs()
            .iter()
            .map(|spec| {
                let mut keywords: Vec<String> =
                    spec.keywords.iter().map(|k| k.to_string()).collect();
                if let Some(more) = extra.get(&spec.field) {
                    for keyword in more {
                        let keyword = keyword.trim().to_lowercase();
                        if !keyword.is_empty() && !keywords.contains(&keyword) {
                            keywords.push(keyword);
                        }
                    }
                }
                (spec.field, keywords)
            })
            .collect();

        Self { schema, fields }
    }

    /// Fields in mapping order
    pub fn fields(&self) -> impl Iterator<Item = (SemanticField, &[String])> {
        self.fields.iter().map(|(f, k)| (*f, k.as_slice()))
    }

    pub fn keywords(&self, field: SemanticField) -> &[String] {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, k)| k.as_slice())
            .unwrap_or(&[])
    }

    /// Keyword groups used to recognise the header row
    pub fn header_groups(&self) -> Vec<Vec<String>> {
        self.schema
            .header_groups()
            .iter()
            .map(|group| {
                group
                    .iter()
                    .flat_map(|field| self.keywords(*field).iter().cloned())
                    .collect()
            })
            .collect()
    }
}

/// Semantic field → column index, for one import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    columns: BTreeMap<SemanticField, usize>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: SemanticField, column: usize) {
        self.columns.insert(field, column);
    }

    /// Column for a field, `None` when absent
    pub fn get(&self, field: SemanticField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn is_claimed(&self, column: usize) -> bool {
        self.columns.values().any(|c| *c == column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SemanticField, usize)> + '_ {
        self.columns.iter().map(|(f, c)| (*f, *c))
    }
}
