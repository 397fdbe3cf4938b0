//! Blockfrost integration for on-chain Mek ownership.
//!
//! The client lists every asset under a stake address; this module picks
//! out the Mek collection and turns it into an ownership snapshot.

pub mod client;
pub mod types;

use std::collections::BTreeMap;

pub use client::{BlockfrostClient, BlockfrostError};
pub use types::*;

use mek_tycoon_core::{default_rate, GoldRateCurve, MekNumber, OwnedMek};

/// Mainnet Blockfrost endpoint.
pub const DEFAULT_BLOCKFROST_API_URL: &str = "https://cardano-mainnet.blockfrost.io/api/v0";

/// Policy id of the Mek collection.
pub const DEFAULT_MEK_POLICY_ID: &str =
    "ffa56051fda3d106a96f09c3d209d4bf24a117406fb813fb8b4548e3";

/// Assets requested per page.
pub const PAGE_SIZE: usize = 100;

/// Most pages fetched for one stake address.
pub const MAX_PAGES: usize = 50;

const MEK_NAME_PREFIX: &str = "mekanism";

/// Parse the Mek number out of a hex asset name such as `"Mekanism0042"`.
///
/// Non-printable bytes are dropped before matching, and the match is
/// case-insensitive.
#[must_use]
pub fn parse_mek_number(asset_name_hex: &str) -> Option<MekNumber> {
    let bytes = hex::decode(asset_name_hex).ok()?;
    let name: String = bytes
        .into_iter()
        .filter(|b| (32..=126).contains(b))
        .map(char::from)
        .collect::<String>()
        .to_ascii_lowercase();

    let start = name.find(MEK_NAME_PREFIX)? + MEK_NAME_PREFIX.len();
    let digits: String = name[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    let number: u32 = digits.parse().ok()?;
    MekNumber::new(u16::try_from(number).ok()?).ok()
}

/// Meks among `assets`, de-duplicated and ordered by number.
///
/// Each Mek earns the configured curve rate for its number, or the default
/// rate when no curve is set.
#[must_use]
pub fn owned_meks(
    assets: &[AddressAsset],
    policy_id: &str,
    curve: Option<&GoldRateCurve>,
) -> Vec<OwnedMek> {
    let mut found: BTreeMap<MekNumber, String> = BTreeMap::new();
    for asset in assets {
        let Some(asset_name) = asset.unit.strip_prefix(policy_id) else {
            continue;
        };
        match parse_mek_number(asset_name) {
            Some(mek) => {
                found.entry(mek).or_insert_with(|| asset.unit.clone());
            }
            None => tracing::debug!(unit = %asset.unit, "Skipping unparseable Mek asset"),
        }
    }

    found
        .into_iter()
        .map(|(mek_number, asset_id)| OwnedMek {
            mek_number,
            asset_id,
            source_key: None,
            gold_per_hour: curve.map_or_else(
                || default_rate(mek_number),
                |curve| curve.rate_for_rank(u32::from(mek_number.get())),
            ),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mek_tycoon_core::CurveType;

    fn asset(unit: String) -> AddressAsset {
        AddressAsset {
            unit,
            quantity: "1".to_string(),
        }
    }

    fn mek_unit(name: &str) -> String {
        format!("{DEFAULT_MEK_POLICY_ID}{}", hex::encode(name))
    }

    #[test]
    fn parses_padded_numbers() {
        assert_eq!(
            parse_mek_number(&hex::encode("Mekanism0042")),
            Some(MekNumber::new(42).unwrap())
        );
        assert_eq!(
            parse_mek_number(&hex::encode("MEKANISM4000")),
            Some(MekNumber::new(4000).unwrap())
        );
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        assert_eq!(parse_mek_number(&hex::encode("Mekanism0000")), None);
        assert_eq!(parse_mek_number(&hex::encode("Mekanism4001")), None);
        assert_eq!(parse_mek_number(&hex::encode("Mekanism")), None);
        assert_eq!(parse_mek_number(&hex::encode("SomethingElse12")), None);
        assert_eq!(parse_mek_number("zz"), None);
    }

    #[test]
    fn filters_policy_and_deduplicates() {
        let assets = vec![
            asset(mek_unit("Mekanism0007")),
            asset(mek_unit("Mekanism0003")),
            asset(mek_unit("Mekanism0007")),
            asset(format!("deadbeef{}", hex::encode("Mekanism0001"))),
            asset("lovelace".to_string()),
        ];
        let meks = owned_meks(&assets, DEFAULT_MEK_POLICY_ID, None);
        let numbers: Vec<u16> = meks.iter().map(|m| m.mek_number.get()).collect();
        assert_eq!(numbers, vec![3, 7]);
        assert_eq!(meks[0].gold_per_hour, default_rate(MekNumber::new(3).unwrap()));
        assert_eq!(meks[0].asset_id, mek_unit("Mekanism0003"));
    }

    #[test]
    fn configured_curve_sets_rates() {
        let curve = GoldRateCurve {
            curve_type: CurveType::Linear,
            min_gold: 20.0,
            max_gold: 20.0,
            ..GoldRateCurve::default()
        };
        let meks = owned_meks(
            &[asset(mek_unit("Mekanism0100"))],
            DEFAULT_MEK_POLICY_ID,
            Some(&curve),
        );
        assert_eq!(meks[0].gold_per_hour, 2000);
    }
}
