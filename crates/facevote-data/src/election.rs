//! House election results scraped from Wikipedia district tables.
//!
//! Each district has an infobox table captioned
//! "{year} {State}'s {n}{suffix} congressional district election". After the
//! header row, row 2 carries the candidate photos, row 3 the names, row 4 the
//! parties, row 5 the vote counts and row 8 the sitting representative.

use crate::error::ScrapeError;
use crate::study::{Election, StateInfo};
use crate::tabular::tf_flag;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

const PHOTO_ROW: usize = 2;
const NAME_ROW: usize = 3;
const PARTY_ROW: usize = 4;
const VOTES_ROW: usize = 5;
const CURRENT_REP_ROW: usize = 8;

/// One candidate in one district race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionRow {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "District")]
    pub district: u32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Photo")]
    pub photo: String,
    #[serde(rename = "Photo_Downloadable", with = "tf_flag")]
    pub photo_downloadable: bool,
    #[serde(rename = "Party")]
    pub party: String,
    /// Raw cell text, thousands separators included.
    #[serde(rename = "Votes")]
    pub votes: String,
    #[serde(rename = "Incumbent")]
    pub incumbent: u8,
    #[serde(rename = "ID")]
    pub id: String,
}

/// English ordinal suffix: 1st, 2nd, 3rd, 4th, 11th, 21st, ...
pub fn ordinal_suffix(n: u32) -> &'static str {
    match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Turn a Wikimedia thumbnail URL into the URL of the full-size original.
///
/// `//upload.wikimedia.org/.../thumb/a/ab/Name.jpg/120px-Name.jpg` becomes
/// `https://upload.wikimedia.org/.../a/ab/Name.jpg`.
pub fn original_image_url(src: &str) -> String {
    let absolute = match src.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => src.to_string(),
    };
    let unthumbed = absolute.replace("/thumb/", "/");
    match unthumbed.rsplit_once('/') {
        Some((head, _)) => head.to_string(),
        None => unthumbed,
    }
}

fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|_| ScrapeError::Selector(css.to_string()))
}

fn cell_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

struct Selectors {
    caption: Selector,
    row: Selector,
    cell: Selector,
    img: Selector,
    rep_link: Selector,
}

impl Selectors {
    fn new() -> Result<Self, ScrapeError> {
        Ok(Self {
            caption: selector("caption")?,
            row: selector("tr")?,
            cell: selector("td")?,
            img: selector("img")?,
            rep_link: selector("p a")?,
        })
    }
}

/// Parse all district tables for one election page.
///
/// Rows with an empty name are dropped and IDs are assigned per district
/// in table order: `{state}_{district}_{k}`.
pub fn parse_election_page(
    html: &str,
    year: i32,
    state: &StateInfo,
) -> Result<Vec<ElectionRow>, ScrapeError> {
    let sel = Selectors::new()?;
    let document = Html::parse_document(html);
    let mut rows = Vec::new();

    for district in 1..=state.districts {
        let title = format!(
            "{year} {}'s {district}{} congressional district election",
            state.name,
            ordinal_suffix(district)
        );

        let Some(caption) = document
            .select(&sel.caption)
            .find(|c| cell_text(c) == title)
        else {
            warn!(district, %title, "district table not found");
            continue;
        };

        let Some(table) = caption
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "table")
        else {
            warn!(district, "caption has no enclosing table");
            continue;
        };

        let table_rows: Vec<ElementRef> = table.select(&sel.row).skip(1).collect();
        if table_rows.len() <= VOTES_ROW {
            warn!(district, rows = table_rows.len(), "district table too short");
            continue;
        }

        let cells = |row: usize| table_rows[row].select(&sel.cell).collect::<Vec<_>>();
        let names = cells(NAME_ROW);
        let parties = cells(PARTY_ROW);
        let votes = cells(VOTES_ROW);
        let photos: Vec<String> = table_rows[PHOTO_ROW]
            .select(&sel.img)
            .map(|img| img.value().attr("src").unwrap_or_default().to_string())
            .collect();

        let current_rep = table_rows.get(CURRENT_REP_ROW).and_then(|row| {
            let rep_cells: Vec<ElementRef> = row.select(&sel.cell).collect();
            if rep_cells.len() >= 2 {
                rep_cells[0].select(&sel.rep_link).next().map(|a| cell_text(&a))
            } else {
                None
            }
        });

        let mut position = 0;
        for (i, name_cell) in names.iter().enumerate() {
            let name = cell_text(name_cell);
            if name.is_empty() {
                continue;
            }
            position += 1;

            let photo = photos.get(i).map(|src| original_image_url(src)).unwrap_or_default();
            let photo_downloadable = !photo.to_lowercase().ends_with(".svg");
            let incumbent = u8::from(current_rep.as_deref() == Some(name.as_str()));

            rows.push(ElectionRow {
                year,
                state: state.code.clone(),
                district,
                photo,
                photo_downloadable,
                party: parties.get(i).map(cell_text).unwrap_or_default(),
                votes: votes.get(i).map(cell_text).unwrap_or_default(),
                incumbent,
                id: format!("{}_{district}_{position}", state.code),
                name,
            });
        }
        debug!(district, candidates = position, "parsed district");
    }

    Ok(rows)
}

/// Fetch and parse one election page.
#[instrument(skip(client, election, state), fields(year = election.year))]
pub async fn scrape_election(
    client: &reqwest::Client,
    election: &Election,
    state: &StateInfo,
) -> Result<Vec<ElectionRow>, ScrapeError> {
    let response = client.get(&election.url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Status {
            url: election.url.clone(),
            status: status.as_u16(),
        });
    }
    let body = response.text().await?;
    let rows = parse_election_page(&body, election.year, state)?;
    info!(candidates = rows.len(), "scraped election results");
    Ok(rows)
}
