use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Fixed-schema set of string fields. Unknown names are ignored and every
/// schema field starts out empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBag {
    schema: &'static [&'static str],
    values: Vec<String>,
}

impl FieldBag {
    pub fn new(schema: &'static [&'static str]) -> Self {
        Self {
            schema,
            values: vec![String::new(); schema.len()],
        }
    }

    /// 回傳是否有寫入（欄位名稱在 schema 內）
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.schema.iter().position(|field| *field == name) {
            Some(index) => {
                self.values[index] = value.into();
                true
            }
            None => false,
        }
    }

    pub fn into_values(self) -> Vec<String> {
        self.values
    }
}

/// Header plus rows, handed from transform to load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn with_header<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub table: Table,
    pub skipped: usize,
    /// 需要原樣輸出的文件（例如 Smithsonian 統計）
    pub document: Option<serde_json::Value>,
}

/// Upload-year counts over a fixed inclusive range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearHistogram {
    counts: BTreeMap<i32, u64>,
    out_of_range: u64,
}

impl YearHistogram {
    pub fn new(years: RangeInclusive<i32>) -> Self {
        Self {
            counts: years.map(|year| (year, 0)).collect(),
            out_of_range: 0,
        }
    }

    /// Years outside the range are not counted; they only bump
    /// `out_of_range`. Returns whether the year was counted.
    pub fn record(&mut self, year: i32) -> bool {
        match self.counts.get_mut(&year) {
            Some(count) => {
                *count += 1;
                true
            }
            None => {
                self.out_of_range += 1;
                false
            }
        }
    }

    pub fn count(&self, year: i32) -> Option<u64> {
        self.counts.get(&year).copied()
    }

    pub fn out_of_range(&self) -> u64 {
        self.out_of_range
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, u64)> + '_ {
        self.counts.iter().map(|(year, count)| (*year, *count))
    }
}

/// One `list=categorymembers` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMember {
    pub pageid: u64,
    pub title: String,
}

/// Total number of records available for one license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseCount {
    pub license: String,
    pub total: usize,
}
