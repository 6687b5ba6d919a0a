//! Turns the honey-hunter calendar page into a [`DailyMaterialTable`].
//!
//! The page has one `calendar_day_wrap` block per weekday, titled with the
//! day name, and one `calendar_region` block per region inside it. Each
//! region links to the materials, characters and weapons it covers; links
//! are told apart by their href:
//!
//! | href            | meaning                              |
//! |-----------------|--------------------------------------|
//! | `/i_n104NNN/`   | talent book                          |
//! | `/i_n114NNN/`   | weapon ascension material            |
//! | `/i_nNNNNN/`    | weapon                               |
//! | `/slug_NNN/`    | character `10000000 + NNN`           |

use once_cell::sync::Lazy;
use regex::Regex;

use super::table::{AreaDailyMaterials, DailyMaterialTable, DayMaterials, WEEKDAYS};
use crate::error::ParseError;
use crate::types::{CharacterId, MaterialId, WeaponId};

const DAY_MARKER: &str = r#"<div class="calendar_day_wrap">"#;
const CHARACTER_ID_BASE: CharacterId = 10_000_000;

static DAY_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<span class="item_secondary_title">\s*([A-Za-z]+)\s*</span>"#).unwrap()
});
static REGION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<div class="calendar_region" data-region="([^"]+)">"#).unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r#"href="/([a-z0-9_]+)/"#).unwrap());
static CHARACTER_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]+(?:_[a-z]+)*_(\d{3})$").unwrap());

/// One link found in a region block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    TalentBook(MaterialId),
    WeaponMaterial(MaterialId),
    Weapon(WeaponId),
    Character(CharacterId),
}

/// Parse the full calendar page
pub fn parse_calendar(html: &str) -> Result<DailyMaterialTable, ParseError> {
    let mut days: [Option<DayMaterials>; 7] = Default::default();

    for block in html.split(DAY_MARKER).skip(1) {
        let title = DAY_TITLE
            .captures(block)
            .map(|c| c[1].to_string())
            .ok_or(ParseError::MissingTitle)?;
        let index = WEEKDAYS
            .iter()
            .position(|d| d.eq_ignore_ascii_case(&title))
            .ok_or_else(|| ParseError::UnknownWeekday(title.clone()))?;

        if days[index].is_some() {
            return Err(ParseError::DuplicateWeekday(title));
        }
        days[index] = Some(parse_day(block, WEEKDAYS[index])?);
    }

    let mut table: [DayMaterials; 7] = Default::default();
    for (index, day) in days.into_iter().enumerate() {
        table[index] = day.ok_or(ParseError::MissingWeekday(WEEKDAYS[index]))?;
    }

    Ok(DailyMaterialTable::new(table))
}

fn parse_day(block: &str, day: &'static str) -> Result<DayMaterials, ParseError> {
    let starts: Vec<(usize, String)> = REGION
        .captures_iter(block)
        .filter_map(|c| Some((c.get(0)?.end(), c[1].to_string())))
        .collect();

    let mut regions = DayMaterials::new();
    for (i, (start, name)) in starts.iter().enumerate() {
        let end = starts
            .get(i + 1)
            .map(|(next, _)| block[..*next].rfind('<').unwrap_or(*next))
            .unwrap_or(block.len());
        let area = regions.entry(name.clone()).or_default();
        for link in links(&block[*start..end]) {
            add_link(area, link);
        }
    }

    if let Some((name, _)) = regions.iter().find(|(_, area)| area.is_empty()) {
        return Err(ParseError::EmptyRegion {
            day,
            region: name.clone(),
        });
    }

    Ok(regions)
}

fn links(text: &str) -> Vec<Link> {
    LINK.captures_iter(text)
        .filter_map(|c| classify(&c[1]))
        .collect()
}

fn classify(slug: &str) -> Option<Link> {
    if let Some(digits) = slug.strip_prefix("i_n") {
        let id: u32 = digits.parse().ok()?;
        return match digits.len() {
            6 if digits.starts_with("104") => Some(Link::TalentBook(id)),
            6 if digits.starts_with("114") => Some(Link::WeaponMaterial(id)),
            5 => Some(Link::Weapon(id)),
            _ => None,
        };
    }

    let caps = CHARACTER_SLUG.captures(slug)?;
    let n: CharacterId = caps[1].parse().ok()?;
    Some(Link::Character(CHARACTER_ID_BASE + n))
}

fn add_link(area: &mut AreaDailyMaterials, link: Link) {
    match link {
        Link::TalentBook(id) => push_unique(&mut area.avatar_material_ids, id),
        Link::WeaponMaterial(id) => push_unique(&mut area.weapon_material_ids, id),
        Link::Weapon(id) => {
            area.weapon_ids.insert(id);
        }
        Link::Character(id) => {
            area.avatar_ids.insert(id);
        }
    }
}

fn push_unique(ids: &mut Vec<MaterialId>, id: MaterialId) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}
