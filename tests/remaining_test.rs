//! End-to-end weekly-remaining requests against in-memory upstreams.

use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use weekly_remaining::config::FAN_OUT;
use weekly_remaining::daily::{AreaDailyMaterials, DailyMaterialTable, DayMaterials};
use weekly_remaining::error::{AccountError, CatalogError, TalentError};
use weekly_remaining::roster::{
    AccountHandle, AccountSelector, CharacterEntry, CharacterInfo, ReferenceCatalog,
    RosterProvider, Talent, RESTRICTED_CODE,
};
use weekly_remaining::talent::UNOWNED_COST;
use weekly_remaining::types::CharacterId;
use weekly_remaining::weekly::{
    AvatarRef, CatalogSource, DropSource, MaterialDetail, MaterialSummary, RequiredBy,
    WeeklyMaterialResolver, NON_COMBAT_PLACEHOLDER, TALENT_MATERIAL_KIND,
};
use weekly_remaining::{RemainingError, RemainingRequest, WeeklyRemaining};

const XIAO: CharacterId = 10000026;
const AYAKA: CharacterId = 10000002;
const HU_TAO: CharacterId = 10000046;
const NEWCOMER: CharacterId = 10000098;

// =============================================================================
// Fake Catalog
// =============================================================================

#[derive(Default)]
struct FakeCatalog {
    summaries: Vec<MaterialSummary>,
    details: HashMap<u32, serde_json::Value>,
    new_characters: Vec<(CharacterId, String)>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeCatalog {
    fn material(mut self, id: u32, name: &str, boss: &str, required_by: serde_json::Value) -> Self {
        self.summaries.push(MaterialSummary {
            id,
            name: name.into(),
            kind: TALENT_MATERIAL_KIND.into(),
            rank: 5,
        });
        self.details.insert(
            id,
            json!({"droppedBy": [{"name": boss}], "requiredBy": {"avatar": required_by}}),
        );
        self
    }

    fn summary_only(mut self, id: u32, name: &str, kind: &str, rank: u8) -> Self {
        self.summaries.push(MaterialSummary {
            id,
            name: name.into(),
            kind: kind.into(),
            rank,
        });
        self
    }

    fn new_character(mut self, id: CharacterId, material: &str) -> Self {
        self.new_characters.push((id, material.into()));
        self
    }

    async fn track<T>(&self, value: T) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        value
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn materials(&self) -> Result<Vec<MaterialSummary>, CatalogError> {
        Ok(self.summaries.clone())
    }

    async fn material_detail(&self, id: u32) -> Result<MaterialDetail, CatalogError> {
        let url = format!("fake://material/{id}");
        let body = self
            .details
            .get(&id)
            .cloned()
            .ok_or(CatalogError::MissingField { url: url.clone(), field: "detail" })?;
        let detail = serde_json::from_value(body).map_err(|source| CatalogError::Decode { url, source });
        self.track(detail).await
    }

    async fn new_characters(&self) -> Result<Vec<CharacterId>, CatalogError> {
        Ok(self.new_characters.iter().map(|(id, _)| *id).collect())
    }

    async fn talent_material(&self, id: CharacterId) -> Result<String, CatalogError> {
        let name = self
            .new_characters
            .iter()
            .find(|(c, _)| *c == id)
            .map(|(_, m)| m.clone())
            .unwrap_or_default();
        Ok(self.track(name).await)
    }
}

fn standard_catalog() -> FakeCatalog {
    FakeCatalog::default()
        .material(113002, "Dvalin's Plume", "Stormterror", json!([]))
        .material(
            113009,
            "Shard of a Foul Legacy",
            "Childe",
            json!([
                {"id": XIAO, "name": "Xiao", "rank": 5},
                {"id": "10000005-anemo", "name": "Traveler", "rank": 5},
            ]),
        )
        .material(113019, "Molten Moment", "Signora", json!([AYAKA]))
        .summary_only(104301, "Teachings of Freedom", TALENT_MATERIAL_KIND, 2)
        .summary_only(113030, NON_COMBAT_PLACEHOLDER, TALENT_MATERIAL_KIND, 5)
        .new_character(HU_TAO, "Shard of a Foul Legacy")
        .new_character(NEWCOMER, NON_COMBAT_PLACEHOLDER)
}

// =============================================================================
// Fake Account
// =============================================================================

struct FakeProvider {
    result: Result<Vec<(CharacterId, Result<Vec<Talent>, TalentError>)>, AccountError>,
}

struct FakeAccount {
    characters: Vec<(CharacterId, Result<Vec<Talent>, TalentError>)>,
    talent_calls: Mutex<Vec<CharacterId>>,
}

#[async_trait]
impl RosterProvider for FakeProvider {
    async fn account(
        &self,
        _user_id: u64,
        _selector: AccountSelector,
    ) -> Result<Box<dyn AccountHandle>, AccountError> {
        let characters = self.result.clone()?;
        Ok(Box::new(FakeAccount {
            characters,
            talent_calls: Mutex::new(Vec::new()),
        }))
    }
}

#[async_trait]
impl AccountHandle for FakeAccount {
    fn player_id(&self) -> u64 {
        800000001
    }

    async fn characters(&self) -> Result<Vec<CharacterEntry>, AccountError> {
        Ok(self
            .characters
            .iter()
            .map(|(id, _)| CharacterEntry {
                level: 90,
                ..CharacterEntry::placeholder(*id, format!("owned {id}"), 5)
            })
            .collect())
    }

    async fn talents(&self, character: CharacterId) -> Result<Vec<Talent>, TalentError> {
        self.talent_calls.lock().unwrap().push(character);
        self.characters
            .iter()
            .find(|(id, _)| *id == character)
            .map(|(_, talents)| talents.clone())
            .unwrap_or(Ok(Vec::new()))
    }
}

fn talents(levels: [u8; 3]) -> Vec<Talent> {
    ["attack", "skill", "burst"]
        .into_iter()
        .zip(levels)
        .map(|(kind, level)| Talent {
            kind: kind.into(),
            level,
        })
        .collect()
}

// =============================================================================
// Reference Data
// =============================================================================

fn reference() -> ReferenceCatalog {
    let info = |name: &str| CharacterInfo {
        name: name.into(),
        rarity: 5,
        icon: None,
    };
    ReferenceCatalog::new(
        [(XIAO, info("Xiao")), (AYAKA, info("Kamisato Ayaka")), (HU_TAO, info("Hu Tao"))]
            .into_iter()
            .collect(),
    )
}

fn daily(characters: &[CharacterId]) -> DailyMaterialTable {
    let mut days: [DayMaterials; 7] = Default::default();
    days[6].insert(
        "Liyue".into(),
        AreaDailyMaterials {
            avatar_ids: characters.iter().copied().collect(),
            avatar_material_ids: vec![104304],
            ..Default::default()
        },
    );
    DailyMaterialTable::new(days)
}

async fn run(
    catalog: FakeCatalog,
    provider: FakeProvider,
    characters: &[CharacterId],
) -> Result<BTreeMap<String, u32>, RemainingError> {
    let resolver = WeeklyMaterialResolver::new(catalog);
    let reference = reference();
    let remaining = WeeklyRemaining {
        resolver: &resolver,
        provider: &provider,
        reference: &reference,
    };
    let report = remaining
        .run(RemainingRequest::default(), &daily(characters))
        .await?;
    Ok(report.tally.into_map())
}

// =============================================================================
// Resolution
// =============================================================================

#[tokio::test]
async fn test_resolution_merges_new_characters() {
    let catalog = FakeCatalog::default()
        .material(1, "MatA", "BossX", json!([1]))
        .new_character(2, "MatA");

    let materials = WeeklyMaterialResolver::new(catalog).resolve().await.unwrap();

    let expected: BTreeMap<CharacterId, String> =
        [(1, "BossX".to_string()), (2, "BossX".to_string())].into_iter().collect();
    assert_eq!(materials.character_to_boss(), expected);
}

#[tokio::test]
async fn test_resolution_filters_catalog() {
    let materials = WeeklyMaterialResolver::new(standard_catalog())
        .resolve()
        .await
        .unwrap();

    assert_eq!(materials.len(), 3);
    assert!(materials.get(NON_COMBAT_PLACEHOLDER).is_none());
    assert!(materials.get("Teachings of Freedom").is_none());

    let childe = materials.get("Shard of a Foul Legacy").unwrap();
    assert_eq!(childe.required_by, [XIAO, HU_TAO].into_iter().collect::<BTreeSet<_>>());

    let bosses = materials.boss_to_characters();
    assert!(bosses["Stormterror"].is_empty());
}

#[tokio::test]
async fn test_malformed_detail_fails_resolution() {
    let mut catalog = standard_catalog();
    catalog
        .details
        .insert(113019, json!({"droppedBy": "Signora", "requiredBy": {}}));

    let err = WeeklyMaterialResolver::new(catalog).resolve().await.unwrap_err();
    assert!(matches!(err, CatalogError::Decode { .. }));
}

#[tokio::test]
async fn test_missing_drop_source_fails_resolution() {
    let mut catalog = FakeCatalog::default().material(1, "MatA", "BossX", json!([1]));
    catalog
        .details
        .insert(1, json!({"droppedBy": [], "requiredBy": {"avatar": [1]}}));

    let err = WeeklyMaterialResolver::new(catalog).resolve().await.unwrap_err();
    assert!(matches!(err, CatalogError::NoDropSource { .. }));
}

#[tokio::test]
async fn test_many_new_characters_merge() {
    let mut catalog = FakeCatalog::default();
    for i in 0..20u32 {
        catalog = catalog.material(200 + i, &format!("Mat{i}"), "Boss", json!([i]));
    }
    for i in 0..12u32 {
        catalog = catalog.new_character(1000 + i, "Mat0");
    }

    let materials = WeeklyMaterialResolver::new(catalog).resolve().await.unwrap();

    assert_eq!(materials.len(), 20);
    assert_eq!(materials.get("Mat0").unwrap().required_by.len(), 13);
}

#[tokio::test]
async fn test_peak_fan_out() {
    let mut catalog = FakeCatalog::default();
    for i in 0..20u32 {
        catalog = catalog.material(200 + i, &format!("Mat{i}"), "Boss", json!([i]));
    }

    let resolver = WeeklyMaterialResolver::new(&catalog);
    resolver.resolve().await.unwrap();

    let peak = catalog.peak.load(Ordering::SeqCst);
    assert!(peak <= FAN_OUT, "peak {peak} exceeds {FAN_OUT}");
    assert!(peak > 1, "lookups should overlap");
}

#[tokio::test]
async fn test_new_character_fan_out() {
    let mut catalog = FakeCatalog::default().material(1, "Mat0", "Boss", json!([1]));
    for i in 0..20u32 {
        catalog = catalog.new_character(1000 + i, "Mat0");
    }

    let resolver = WeeklyMaterialResolver::new(&catalog);
    let materials = resolver.resolve().await.unwrap();
    assert_eq!(materials.get("Mat0").unwrap().required_by.len(), 21);

    // One detail lookup, so any overlap comes from the new-character lookups
    let peak = catalog.peak.load(Ordering::SeqCst);
    assert!(peak <= FAN_OUT, "peak {peak} exceeds {FAN_OUT}");
    assert!(peak > 1, "lookups should overlap");
}

#[tokio::test]
async fn test_avatar_objects_resolve() {
    let catalog = FakeCatalog::default().material(
        1,
        "MatA",
        "BossX",
        json!([
            {"id": AYAKA, "name": "Kamisato Ayaka", "rank": 5},
            {"id": "10000005-geo", "name": "Traveler", "rank": 5},
            {"id": XIAO, "name": "Xiao", "rank": 5},
        ]),
    );

    let materials = WeeklyMaterialResolver::new(catalog).resolve().await.unwrap();

    assert_eq!(
        materials.get("MatA").unwrap().required_by,
        [AYAKA, XIAO].into_iter().collect::<BTreeSet<_>>()
    );
}

#[test]
fn test_avatar_refs_decode() {
    let detail: MaterialDetail = serde_json::from_value(json!({
        "droppedBy": [{"name": "Childe"}],
        "requiredBy": {"avatar": [XIAO, "10000005-anemo"]}
    }))
    .unwrap();

    assert_eq!(
        detail,
        MaterialDetail {
            dropped_by: vec![DropSource { name: "Childe".into() }],
            required_by: RequiredBy {
                avatar: vec![AvatarRef::Id(XIAO), AvatarRef::Tagged("10000005-anemo".into())],
            },
        }
    );
}

// =============================================================================
// Requests
// =============================================================================

#[tokio::test]
async fn test_owned_and_unowned_share_a_boss() {
    let catalog = FakeCatalog::default()
        .material(1, "MatA", "BossX", json!([XIAO, AYAKA]))
        .material(2, "MatB", "BossY", json!([]));
    let provider = FakeProvider {
        result: Ok(vec![(XIAO, Ok(talents([9, 9, 8])))]),
    };

    let tally = run(catalog, provider, &[XIAO, AYAKA]).await.unwrap();

    assert_eq!(tally["BossX"], 1 + UNOWNED_COST);
    assert_eq!(tally["BossY"], 0);
}

#[tokio::test]
async fn test_full_request() {
    let provider = FakeProvider {
        result: Ok(vec![
            (XIAO, Ok(talents([10, 9, 6]))),
            (10000007, Ok(talents([1, 1, 1]))),
        ]),
    };

    let tally = run(standard_catalog(), provider, &[XIAO, AYAKA, HU_TAO, 10000099])
        .await
        .unwrap();

    // Xiao: 0 + 0 + 4, Hu Tao unowned; Ayaka unowned; 10000099 has no boss
    assert_eq!(tally["Childe"], 4 + UNOWNED_COST);
    assert_eq!(tally["Signora"], UNOWNED_COST);
    assert_eq!(tally["Stormterror"], 0);
    assert_eq!(tally.len(), 3);
}

#[tokio::test]
async fn test_account_errors_are_reported() {
    for error in [
        AccountError::NotBound,
        AccountError::InvalidCredentials,
        AccountError::PlayerNotFound,
    ] {
        let provider = FakeProvider {
            result: Err(error.clone()),
        };
        let result = run(standard_catalog(), provider, &[XIAO]).await;
        assert!(matches!(result, Err(RemainingError::Account(e)) if e == error));
    }
}

#[tokio::test]
async fn test_catalog_failure_fails_request() {
    let catalog = standard_catalog().new_character(NEWCOMER + 1, "Unreleased Relic");
    let provider = FakeProvider { result: Ok(Vec::new()) };

    let result = run(catalog, provider, &[XIAO]).await;
    assert!(matches!(
        result,
        Err(RemainingError::Catalog(CatalogError::UnknownMaterial { .. }))
    ));
}

#[tokio::test]
async fn test_damaged_account_counts_remaining_as_unowned() {
    let catalog = FakeCatalog::default().material(1, "MatA", "BossX", json!([XIAO, AYAKA, HU_TAO]));
    let restricted = TalentError::Api {
        code: RESTRICTED_CODE,
        message: "visits too frequently".into(),
    };
    let provider = FakeProvider {
        result: Ok(vec![
            (AYAKA, Ok(talents([9, 9, 9]))),
            (XIAO, Err(restricted)),
            (HU_TAO, Ok(talents([9, 9, 9]))),
        ]),
    };

    // Roster order follows character id: Ayaka, Xiao, Hu Tao
    let tally = run(catalog, provider, &[XIAO, AYAKA, HU_TAO]).await.unwrap();

    // Xiao's read fails and Hu Tao is never read once the handle is damaged
    assert_eq!(tally["BossX"], 2 * UNOWNED_COST);
}
