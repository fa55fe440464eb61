//! Availability listing scraper.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::config::PortalConfig;

use super::error::{check_transient, transport_error, PortalError};
use super::types::{normalize_identifier, CatalogRecord, Session};

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table.datagrid").unwrap());
static ROWS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr.datagrid-even, tr.datagrid-odd").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static SLOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)\s*/\s*(\d+)\s*$").unwrap());

// Column positions in the listing table
const COL_NAME: usize = 0;
const COL_INSTRUCTOR: usize = 4;
const COL_IDENTIFIER: usize = 5;
const COL_GROUP: usize = 6;
const COL_SLOTS: usize = 9;
const COL_CLAIM: usize = 10;

/// Fetches and parses the seat-availability listing.
pub struct CatalogScraper {
    listing_url: String,
    base_url: Url,
}

impl CatalogScraper {
    pub fn new(config: &PortalConfig) -> Result<Self, PortalError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| PortalError::Client(format!("invalid portal base URL: {}", e)))?;
        Ok(Self {
            listing_url: config.listing_url.clone(),
            base_url,
        })
    }

    /// Read the first page of the listing.
    pub async fn fetch(&self, session: &Session) -> Result<Vec<CatalogRecord>, PortalError> {
        let response = session
            .client()
            .get(&self.listing_url)
            .send()
            .await
            .map_err(transport_error)?;

        check_transient(response.status(), "listing")?;

        let body = response.text().await.map_err(transport_error)?;
        let records = parse_catalog(&body, &self.base_url)?;
        debug!(records = records.len(), "Catalog fetched");
        Ok(records)
    }
}

/// Parse the listing markup.
///
/// A missing table or any unparseable cell means the portal served something
/// other than the listing, which in practice is the login page.
pub fn parse_catalog(html: &str, base_url: &Url) -> Result<Vec<CatalogRecord>, PortalError> {
    let document = Html::parse_document(html);

    let table = document
        .select(&TABLE)
        .next()
        .ok_or_else(|| PortalError::session_expired("listing table not found"))?;

    table
        .select(&ROWS)
        .enumerate()
        .map(|(idx, row)| {
            parse_row(row, base_url)
                .map_err(|reason| PortalError::session_expired(format!("row {}: {}", idx, reason)))
        })
        .collect()
}

fn parse_row(row: ElementRef<'_>, base_url: &Url) -> Result<CatalogRecord, String> {
    let cells: Vec<ElementRef<'_>> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .collect();

    if cells.len() <= COL_CLAIM {
        return Err(format!("expected at least {} cells, got {}", COL_CLAIM + 1, cells.len()));
    }

    let name = cell_text(&cells[COL_NAME]);
    if name.is_empty() {
        return Err("empty name".to_string());
    }

    let raw_identifier = cell_text(&cells[COL_IDENTIFIER]);
    let identifier = normalize_identifier(&raw_identifier)
        .ok_or_else(|| format!("identifier {:?} is not an integer", raw_identifier))?;

    let (occupied, capacity) = parse_slots(&cell_text(&cells[COL_SLOTS]))?;
    let occupied = if occupied > capacity {
        debug!(name = %name, occupied, capacity, "Occupancy above capacity, clamping");
        capacity
    } else {
        occupied
    };

    let href = cells[COL_CLAIM]
        .select(&LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .ok_or_else(|| "claim link missing".to_string())?;
    let claim_url = base_url
        .join(href.trim())
        .map_err(|e| format!("claim link {:?} does not resolve: {}", href, e))?;

    Ok(CatalogRecord {
        name,
        identifier,
        group: cell_text(&cells[COL_GROUP]),
        instructor: cell_text(&cells[COL_INSTRUCTOR]),
        capacity,
        occupied,
        claim_url: claim_url.to_string(),
    })
}

/// "used/max" -> (used, max)
fn parse_slots(text: &str) -> Result<(u32, u32), String> {
    let caps = SLOTS
        .captures(text)
        .ok_or_else(|| format!("slot text {:?} is not used/max", text))?;
    let occupied = caps[1]
        .parse::<u32>()
        .map_err(|e| format!("occupied count: {}", e))?;
    let capacity = caps[2]
        .parse::<u32>()
        .map_err(|e| format!("capacity: {}", e))?;
    Ok((occupied, capacity))
}

/// Cell text with whitespace runs collapsed.
fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://portal.test").unwrap()
    }

    fn row(class: &str, name: &str, id: &str, group: &str, slots: &str, href: &str) -> String {
        format!(
            r#"<tr class="{class}">
                <td class="datagrid">{name}</td>
                <td class="datagrid">Lecture</td>
                <td class="datagrid">3.0</td>
                <td class="datagrid">1-16</td>
                <td class="datagrid">Dr. Smith</td>
                <td class="datagrid">{id}</td>
                <td class="datagrid">{group}</td>
                <td class="datagrid">Mon 1-2</td>
                <td class="datagrid">No limit</td>
                <td class="datagrid"><span>{slots}</span></td>
                <td class="datagrid"><a href="{href}"><span>Elect</span></a></td>
            </tr>"#
        )
    }

    fn page(rows: &[String]) -> String {
        format!(
            r#"<html><body>
            <table class="datagrid">
              <tr class="datagrid-header"><th>Name</th></tr>
              {}
            </table>
            </body></html>"#,
            rows.join("\n")
        )
    }

    #[test]
    fn test_parse_single_row() {
        let html = page(&[row(
            "datagrid-even",
            "Intro to X",
            "1234",
            "CS",
            "49 / 50",
            "/elective2008/edu/elect.do?index=3&seq=1",
        )]);
        let records = parse_catalog(&html, &base()).unwrap();
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.name, "Intro to X");
        assert_eq!(r.identifier, 1234);
        assert_eq!(r.group, "CS");
        assert_eq!(r.instructor, "Dr. Smith");
        assert_eq!(r.occupied, 49);
        assert_eq!(r.capacity, 50);
        assert!(r.has_vacancy());
        assert_eq!(
            r.claim_url,
            "http://portal.test/elective2008/edu/elect.do?index=3&seq=1"
        );
    }

    #[test]
    fn test_parse_keeps_listing_order_across_row_classes() {
        let html = page(&[
            row("datagrid-even", "A", "01", "CS", "1/2", "a.do"),
            row("datagrid-odd", "B", "02", "Math", "2/2", "b.do"),
            row("datagrid-even", "C", "03", "Phys", "0/9", "http://other.test/c.do"),
        ]);
        let records = parse_catalog(&html, &base()).unwrap();
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(records[0].identifier, 1);
        assert_eq!(records[2].claim_url, "http://other.test/c.do");
    }

    #[test]
    fn test_missing_table_means_session_expired() {
        let err = parse_catalog("<html><body><form id=\"login\"></form></body></html>", &base())
            .unwrap_err();
        assert!(err.is_session_expired());
    }

    #[test]
    fn test_empty_document_means_session_expired() {
        assert!(parse_catalog("", &base()).unwrap_err().is_session_expired());
    }

    #[test]
    fn test_bad_slot_text_means_session_expired() {
        let html = page(&[row("datagrid-even", "A", "1", "CS", "full", "a.do")]);
        assert!(parse_catalog(&html, &base()).unwrap_err().is_session_expired());
    }

    #[test]
    fn test_bad_identifier_means_session_expired() {
        let html = page(&[row("datagrid-even", "A", "x12", "CS", "1/2", "a.do")]);
        let err = parse_catalog(&html, &base()).unwrap_err();
        assert!(err.is_session_expired());
        assert!(err.to_string().contains("row 0"));
    }

    #[test]
    fn test_short_row_means_session_expired() {
        let html = page(&[r#"<tr class="datagrid-odd"><td>only</td></tr>"#.to_string()]);
        assert!(parse_catalog(&html, &base()).unwrap_err().is_session_expired());
    }

    #[test]
    fn test_missing_link_means_session_expired() {
        let html = page(&[row("datagrid-even", "A", "1", "CS", "1/2", "a.do")
            .replace(r#"<a href="a.do">"#, "<a>")]);
        assert!(parse_catalog(&html, &base()).unwrap_err().is_session_expired());
    }

    #[test]
    fn test_table_without_rows_is_empty_listing() {
        let records = parse_catalog(&page(&[]), &base()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_overfull_row_is_clamped() {
        let html = page(&[row("datagrid-even", "A", "1", "CS", "52/50", "a.do")]);
        let records = parse_catalog(&html, &base()).unwrap();
        assert_eq!(records[0].occupied, 50);
        assert!(!records[0].has_vacancy());
    }

    #[test]
    fn test_parse_slots() {
        assert_eq!(parse_slots("49/50").unwrap(), (49, 50));
        assert_eq!(parse_slots(" 0 / 120 ").unwrap(), (0, 120));
        assert!(parse_slots("49").is_err());
        assert!(parse_slots("-1/50").is_err());
    }
}
