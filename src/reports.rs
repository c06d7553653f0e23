// The four report assemblers.
//
// Each one projects a fixed column set out of the aggregate tables.
// None mutates another's inputs; they can run in any order.
use crate::aggregate::{aggregate, LoggerCounts, Metrics, UserModeKey};
use crate::pivot::{ModeLogs, UserWide};
use crate::territory::UNKNOWN_OUT_OF_REGION;
use crate::types::{AuditRow, GdotRow, LocatedUser, Method, TableauRow, TdmRow};
use crate::zones::{OUT_OF_REGION, UNKNOWN};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Tableau extract: one row per (Home ZIP, ESO, Method) from the
/// unadjusted per-user aggregate, drive rows excluded, stamped with the
/// reporting start date. The key order doubles as the sort order.
pub fn generate_tableau(
    per_user: &BTreeMap<UserModeKey, Metrics>,
    report_date: NaiveDate,
) -> Vec<TableauRow> {
    let groups = aggregate(
        per_user
            .iter()
            .filter(|((_, method, _, _), _)| !method.is_drive()),
        |((_, method, eso, zip), _)| (zip.clone(), eso.clone(), method.clone()),
        |acc: &mut Metrics, (_, metrics)| {
            acc.trips += metrics.trips;
            acc.miles += metrics.miles;
            acc.vmr += metrics.vmr;
            acc.co2_grams += metrics.co2_grams;
            acc.dollars += metrics.dollars;
        },
    );

    groups
        .into_iter()
        .map(|((zip, eso, method), metrics)| TableauRow {
            date: report_date,
            home_zip: zip,
            eso,
            method: method.label().to_string(),
            trips: metrics.trips,
            miles: metrics.miles,
            vmr: metrics.vmr,
            co2: metrics.co2_grams,
            dollars: metrics.dollars,
        })
        .collect()
}

/// GDOT summary: one row per territory joining the metric totals, the
/// new-user counts, the wide mode-log columns, and the logger counts.
/// Inner join semantics: a territory absent from any source is dropped,
/// not defaulted.
pub fn generate_gdot(
    totals: &BTreeMap<String, Metrics>,
    new_users: &BTreeMap<String, i64>,
    mode_logs: &BTreeMap<String, ModeLogs>,
    loggers: &BTreeMap<String, LoggerCounts>,
) -> Vec<GdotRow> {
    totals
        .iter()
        .filter_map(|(territory, metrics)| {
            let new_users = new_users.get(territory)?;
            let logs = mode_logs.get(territory)?;
            let counts = loggers.get(territory)?;
            Some(GdotRow {
                territory: territory.clone(),
                new_users: *new_users,
                loggers: counts.loggers,
                clean_loggers: counts.clean_loggers,
                carpool_logs: logs.carpool,
                vanpool_logs: logs.vanpool,
                transit_logs: logs.transit,
                telework_logs: logs.telework,
                walk_logs: logs.walk,
                bike_logs: logs.bike,
                scooter_logs: logs.scooter,
                cww_logs: logs.cww,
                reduced_vmt: metrics.vmr,
                reduced_co2_pounds: metrics.co2_pounds(),
                money_saved: metrics.dollars,
            })
        })
        .collect()
}

/// TDM extract: one row per active user, left-joined with the wide
/// per-user mode blocks. Users with no logged trips get all-zero
/// blocks and no logger indicators.
pub fn generate_tdm(
    users: &[LocatedUser],
    wide: &BTreeMap<String, UserWide>,
    month: NaiveDate,
) -> Vec<TdmRow> {
    users
        .iter()
        .filter(|u| u.user.active)
        .map(|u| {
            let blocks = wide.get(&u.user.user_id).cloned().unwrap_or_default();
            TdmRow {
                user_id: u.user.user_id.clone(),
                home_x: u.user.home_lon,
                home_y: u.user.home_lat,
                work_x: u.user.work_lon,
                work_y: u.user.work_lat,
                tma: u.user.tma.clone().unwrap_or_default(),
                legacy: (!u.user.legacy_id.is_empty()).then_some(1),
                active: 1,
                new_user: u8::from(u.is_new_user),
                created_date: u.user.created_raw.clone(),
                modes: blocks.modes,
                clean: blocks.clean,
                month,
                county_id_work: u.work_county_fips.clone(),
                county_work: u.work_county_name.clone(),
                zip_code_work: u.work_zip.clone(),
                eso: u.work_eso.clone(),
                county_id_home: u.home_county_fips.clone(),
                county_home: u.home_county_name.clone(),
                zip_code_home: u.home_zip.clone(),
            }
        })
        .collect()
}

/// Bring a geocoded ESO label into the vocabulary the source system
/// uses for its self-reported TMA field.
fn audit_geocoded_label(eso: &str) -> String {
    let stripped = eso.replace(':', "");
    if stripped == UNKNOWN || stripped == OUT_OF_REGION {
        return UNKNOWN_OUT_OF_REGION.to_string();
    }
    match stripped.as_str() {
        "Midtown Transportation" => "Midtown Alliance".to_string(),
        "ASAP" => "Atlantic Station (ASAP)".to_string(),
        _ => stripped,
    }
}

/// ESO audit: discrepancy list of users whose geocoded service area
/// disagrees with the source system's self-reported one. Agreeing rows
/// are dropped.
pub fn generate_audit(users: &[LocatedUser]) -> Vec<AuditRow> {
    users
        .iter()
        .filter_map(|u| {
            let geocoded = audit_geocoded_label(&u.work_eso);
            let tma = u
                .user
                .tma
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNKNOWN_OUT_OF_REGION.to_string());
            if geocoded == tma {
                return None;
            }
            Some(AuditRow {
                user_id: u.user.user_id.clone(),
                first_name: u.user.first_name.clone(),
                last_name: u.user.last_name.clone(),
                work_location: u.user.work_location.clone(),
                tma,
                eso_geocoded: geocoded,
            })
        })
        .collect()
}
