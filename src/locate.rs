// Per-user location resolution.
//
// Each user's home and work points are classified independently against
// all three zone layers. The service-area result is authoritative: a
// coordinate whose ESO comes back `Unknown` or `Out of Region` carries
// that same code in its ZIP and county fields, so a user is never half
// classified.
use crate::territory;
use crate::types::{LocatedUser, UserRecord};
use crate::zones::{ZoneHit, ZoneLayers};
use chrono::NaiveDate;

struct CoordZones {
    eso: String,
    zip: String,
    county_name: String,
    county_fips: String,
}

fn resolve_coord(layers: &ZoneLayers, lon: Option<f64>, lat: Option<f64>) -> CoordZones {
    let eso = layers.eso.classify(lon, lat);
    match eso {
        ZoneHit::Zone(_) => {
            let county = layers.county.classify(lon, lat);
            CoordZones {
                eso: eso.id().to_string(),
                zip: layers.zcta.classify(lon, lat).id().to_string(),
                county_name: county.name().to_string(),
                county_fips: county.id().to_string(),
            }
        }
        // ESO status wins over whatever the other layers would say.
        _ => {
            let code = eso.id().to_string();
            CoordZones {
                eso: code.clone(),
                zip: code.clone(),
                county_name: code.clone(),
                county_fips: code,
            }
        }
    }
}

/// Classify one user's home and work points and derive the funding and
/// territory labels. The work-side ESO is the user's service area of
/// record; the home-side ESO only establishes whether the home address
/// is within region.
pub fn locate_user(
    user: UserRecord,
    layers: &ZoneLayers,
    start: NaiveDate,
    end: NaiveDate,
) -> LocatedUser {
    let work = resolve_coord(layers, user.work_lon, user.work_lat);
    let home = resolve_coord(layers, user.home_lon, user.home_lat);

    let (funding_adjusted, territory) = territory::normalize(&work.eso, user.funding_flag);

    let is_new_user = user
        .created_date
        .map(|d| d >= start && d <= end)
        .unwrap_or(false);

    LocatedUser {
        user,
        work_eso: work.eso,
        work_zip: work.zip,
        work_county_name: work.county_name,
        work_county_fips: work.county_fips,
        home_eso: home.eso,
        home_zip: home.zip,
        home_county_name: home.county_name,
        home_county_fips: home.county_fips,
        funding_adjusted,
        territory,
        is_new_user,
    }
}

pub fn locate_users(
    users: Vec<UserRecord>,
    layers: &ZoneLayers,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<LocatedUser> {
    users
        .into_iter()
        .map(|u| locate_user(u, layers, start, end))
        .collect()
}
