//! Declarative fallback tables, one per view.
//!
//! Each output field lists the provider keys to try in order and the placeholder
//! used when none of them is populated. Prices, volumes and sizes fall back to `0`;
//! ratios, text and dates fall back to the "N/A" marker.

use super::ViewType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Zero,
    NotAvailable,
}

/// Values computed from daily history when the provider omits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derived {
    YearHigh,
    YearLow,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub sources: &'static [&'static str],
    pub fallback: Fallback,
    pub derived: Option<Derived>,
}

const fn number(name: &'static str, sources: &'static [&'static str]) -> FieldSpec {
    FieldSpec {
        name,
        sources,
        fallback: Fallback::Zero,
        derived: None,
    }
}

const fn text(name: &'static str, sources: &'static [&'static str]) -> FieldSpec {
    FieldSpec {
        name,
        sources,
        fallback: Fallback::NotAvailable,
        derived: None,
    }
}

const fn derived(name: &'static str, sources: &'static [&'static str], how: Derived) -> FieldSpec {
    FieldSpec {
        name,
        sources,
        fallback: Fallback::NotAvailable,
        derived: Some(how),
    }
}

const NAME: FieldSpec = text("name", &["longName", "shortName"]);
const CURRENT_PRICE: FieldSpec = number("currentPrice", &["currentPrice", "regularMarketPrice"]);
const CHANGE: FieldSpec = number("change", &["regularMarketChange"]);
const CHANGE_PERCENT: FieldSpec = number("changePercent", &["regularMarketChangePercent"]);
const VOLUME: FieldSpec = number("volume", &["volume", "regularMarketVolume"]);
const MARKET_CAP: FieldSpec = number("marketCap", &["marketCap"]);
const PE_RATIO: FieldSpec = text("peRatio", &["trailingPE", "forwardPE"]);
const EPS: FieldSpec = text("eps", &["trailingEps", "forwardEps"]);
const PRICE_TO_BOOK: FieldSpec = text("priceToBook", &["priceToBook"]);
const DIVIDEND_YIELD: FieldSpec = text("dividendYield", &["dividendYield"]);
const SECTOR: FieldSpec = text("sector", &["sector"]);

pub const PRICE_ONLY: &[FieldSpec] = &[CURRENT_PRICE, CHANGE, CHANGE_PERCENT, VOLUME];

pub const SUMMARY: &[FieldSpec] = &[
    NAME,
    CURRENT_PRICE,
    CHANGE,
    CHANGE_PERCENT,
    PE_RATIO,
    EPS,
    PRICE_TO_BOOK,
    DIVIDEND_YIELD,
    SECTOR,
    MARKET_CAP,
    VOLUME,
    text("fiftyTwoWeekHigh", &["fiftyTwoWeekHigh"]),
    text("fiftyTwoWeekLow", &["fiftyTwoWeekLow"]),
];

pub const FULL: &[FieldSpec] = &[
    // price
    NAME,
    CURRENT_PRICE,
    number("open", &["open", "regularMarketOpen"]),
    number("dayHigh", &["dayHigh", "regularMarketDayHigh"]),
    number("dayLow", &["dayLow", "regularMarketDayLow"]),
    number(
        "previousClose",
        &["previousClose", "regularMarketPreviousClose"],
    ),
    CHANGE,
    CHANGE_PERCENT,
    // volume and size
    VOLUME,
    number("averageVolume", &["averageVolume", "averageVolume10days"]),
    MARKET_CAP,
    text("currency", &["currency"]),
    // 52-week
    derived("fiftyTwoWeekHigh", &["fiftyTwoWeekHigh"], Derived::YearHigh),
    derived("fiftyTwoWeekLow", &["fiftyTwoWeekLow"], Derived::YearLow),
    text("fiftyTwoWeekChange", &["52WeekChange"]),
    // valuation
    PE_RATIO,
    text("pegRatio", &["pegRatio"]),
    PRICE_TO_BOOK,
    text("priceToSales", &["priceToSalesTrailing12Months"]),
    number("enterpriseValue", &["enterpriseValue"]),
    text("evToRevenue", &["enterpriseToRevenue"]),
    text("evToEbitda", &["enterpriseToEbitda"]),
    // financials
    EPS,
    text("beta", &["beta"]),
    text("bookValue", &["bookValue"]),
    text("profitMargins", &["profitMargins"]),
    text("returnOnAssets", &["returnOnAssets"]),
    text("returnOnEquity", &["returnOnEquity"]),
    // dividends
    DIVIDEND_YIELD,
    text("dividendRate", &["dividendRate"]),
    text("exDividendDate", &["exDividendDate"]),
    text("payoutRatio", &["payoutRatio"]),
    text("fiveYearAvgDividendYield", &["fiveYearAvgDividendYield"]),
    // company
    SECTOR,
    text("industry", &["industry"]),
    text("country", &["country"]),
    text("exchange", &["exchange"]),
    text("quoteType", &["quoteType"]),
    text("website", &["website"]),
    number("employees", &["fullTimeEmployees"]),
    // moving averages
    number("fiftyDayAverage", &["fiftyDayAverage"]),
    number("twoHundredDayAverage", &["twoHundredDayAverage"]),
    // balance sheet
    number("totalCash", &["totalCash"]),
    number("totalDebt", &["totalDebt"]),
    text("debtToEquity", &["debtToEquity"]),
    text("currentRatio", &["currentRatio"]),
    text("quickRatio", &["quickRatio"]),
    text("grossMargins", &["grossMargins"]),
    text("operatingMargins", &["operatingMargins"]),
    // revenue and growth
    number("totalRevenue", &["totalRevenue"]),
    text("revenuePerShare", &["revenuePerShare"]),
    text("revenueGrowth", &["revenueGrowth"]),
    text("earningsGrowth", &["earningsGrowth"]),
    // analysts
    text("recommendationMean", &["recommendationMean"]),
    text("recommendationKey", &["recommendationKey"]),
    number("numberOfAnalystOpinions", &["numberOfAnalystOpinions"]),
    text("targetHighPrice", &["targetHighPrice"]),
    text("targetLowPrice", &["targetLowPrice"]),
    text("targetMeanPrice", &["targetMeanPrice"]),
    // ownership
    number("sharesOutstanding", &["sharesOutstanding"]),
    number("floatShares", &["floatShares"]),
    text("heldPercentInsiders", &["heldPercentInsiders"]),
    text("heldPercentInstitutions", &["heldPercentInstitutions"]),
    text("shortRatio", &["shortRatio"]),
    text("shortPercentOfFloat", &["shortPercentOfFloat"]),
    text("lastMarketUpdate", &["regularMarketTime"]),
];

pub fn fields_for(view: ViewType) -> &'static [FieldSpec] {
    match view {
        ViewType::PriceOnly => PRICE_ONLY,
        ViewType::Summary => SUMMARY,
        ViewType::Full => FULL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn field_names_are_unique_per_view() {
        for view in [ViewType::PriceOnly, ViewType::Summary, ViewType::Full] {
            let mut seen = HashSet::new();
            for spec in fields_for(view) {
                assert!(seen.insert(spec.name), "{} duplicated in {view:?}", spec.name);
                assert!(!spec.sources.is_empty(), "{} has no sources", spec.name);
            }
        }
    }

    #[test]
    fn full_is_a_superset_of_summary_and_price() {
        let full: HashSet<_> = FULL.iter().map(|spec| spec.name).collect();
        for spec in SUMMARY.iter().chain(PRICE_ONLY) {
            assert!(full.contains(spec.name), "{} missing from full view", spec.name);
        }
    }
}
