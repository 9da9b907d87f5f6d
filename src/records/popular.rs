use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Context, Result};

/// Curated symbol lists served for quick access, grouped as in the CSV asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PopularSymbols {
    #[serde(flatten)]
    pub lists: BTreeMap<String, Vec<String>>,
    pub sectors: BTreeMap<String, Vec<String>>,
}

impl PopularSymbols {
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty() && self.sectors.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Category {
    List,
    Sector,
}

#[derive(Debug, Deserialize)]
struct Row {
    category: Category,
    group: String,
    symbol: String,
}

/// Load popular symbols from `path`, falling back to empty groups when the file is missing.
pub fn load_or_default(path: &Path) -> Result<PopularSymbols> {
    if !path.exists() {
        log::warn!(
            "Popular symbols file {} not found, serving empty lists",
            path.display()
        );
        return Ok(PopularSymbols::default());
    }
    load_from_path(path)
}

pub fn load_from_path(path: &Path) -> Result<PopularSymbols> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open popular symbols CSV at {}", path.display()))?;
    parse(file)
}

fn parse<R: Read>(reader: R) -> Result<PopularSymbols> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut popular = PopularSymbols::default();
    for (line, row) in reader.deserialize::<Row>().enumerate() {
        let row = row?;
        if row.group.is_empty() || row.symbol.is_empty() {
            return Err(AppError::message(format!(
                "popular symbols row {} has an empty group or symbol",
                line + 1
            )));
        }

        let target = match row.category {
            Category::List => &mut popular.lists,
            Category::Sector => &mut popular.sectors,
        };
        target.entry(row.group).or_default().push(row.symbol);
    }

    Ok(popular)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_rows_by_category() {
        let csv = "category,group,symbol\n\
                   # headline list\n\
                   list,nifty50_top10,RELIANCE.NS\n\
                   list,nifty50_top10, TCS.NS\n\
                   sector,IT,INFY.NS\n\
                   sector,Banking,SBIN.NS\n";

        let popular = parse(csv.as_bytes()).expect("csv parses");

        assert_eq!(popular.lists["nifty50_top10"], vec!["RELIANCE.NS", "TCS.NS"]);
        assert_eq!(popular.sectors["IT"], vec!["INFY.NS"]);
        assert_eq!(popular.sectors["Banking"], vec!["SBIN.NS"]);
    }

    #[test]
    fn serializes_lists_at_top_level() {
        let csv = "category,group,symbol\nlist,top,TCS.NS\nsector,IT,INFY.NS\n";
        let popular = parse(csv.as_bytes()).expect("csv parses");

        let value = serde_json::to_value(&popular).expect("serializes");

        assert_eq!(value["top"][0], "TCS.NS");
        assert_eq!(value["sectors"]["IT"][0], "INFY.NS");
    }

    #[test]
    fn rejects_unknown_category() {
        let err = parse("category,group,symbol\nindex,top,TCS.NS\n".as_bytes())
            .expect_err("unknown category should fail");
        assert!(matches!(err, AppError::Csv(_)), "unexpected error: {err}");
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let popular = load_or_default(&dir.path().join("popular.csv")).expect("defaults");
        assert!(popular.is_empty());
    }

    #[test]
    fn bundled_asset_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/popular.csv");
        let popular = load_from_path(&path).expect("bundled asset loads");

        assert_eq!(popular.lists["nifty50_top10"].len(), 10);
        assert!(popular.sectors.contains_key("IT"));
    }
}
