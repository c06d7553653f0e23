// Input loading and cleaning.
//
// Raw spreadsheet exports come in as CSV with the source system's
// column headers. Structural problems (missing file, broken CSV) are
// fatal; per-row problems degrade: a row without a user id is skipped
// and counted, a bad coordinate or timestamp just leaves that field
// empty for the downstream fallback paths.
//
// The inputs are expected to be pre-filtered upstream: internal and
// test accounts are already gone by the time these files land here.
use crate::error::ReportError;
use crate::types::{Method, RawTripRow, RawUserRow, TripRecord, UserRecord};
use crate::util::{parse_coord_pair, parse_created_date, parse_f64_safe, parse_flag};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub skipped_rows: usize,
}

pub fn load_users(path: &str) -> Result<(Vec<UserRecord>, LoadReport), ReportError> {
    users_from_reader(File::open(path)?)
}

pub fn load_trips(path: &str) -> Result<(Vec<TripRecord>, LoadReport), ReportError> {
    trips_from_reader(File::open(path)?)
}

fn users_from_reader<R: Read>(reader: R) -> Result<(Vec<UserRecord>, LoadReport), ReportError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut total_rows = 0usize;
    let mut skipped_rows = 0usize;
    let mut users: Vec<UserRecord> = Vec::new();

    for result in rdr.deserialize::<RawUserRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Skipping unreadable user row: {}", e);
                skipped_rows += 1;
                continue;
            }
        };

        // A user without an id can't be joined or reported anywhere.
        let user_id = match row.user_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                skipped_rows += 1;
                continue;
            }
        };

        let (home_lon, home_lat) = parse_coord_pair(row.home_coords.as_deref());
        let (work_lon, work_lat) = parse_coord_pair(row.work_coords.as_deref());
        let created_raw = row.created.unwrap_or_default().trim().to_string();
        let funding_flag = row
            .state_fed
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);

        users.push(UserRecord {
            user_id,
            first_name: row.first_name.unwrap_or_default().trim().to_string(),
            last_name: row.last_name.unwrap_or_default().trim().to_string(),
            home_lon,
            home_lat,
            work_lon,
            work_lat,
            work_location: row.work_location.unwrap_or_default().trim().to_string(),
            funding_flag,
            created_date: parse_created_date(Some(&created_raw)),
            created_raw,
            active: parse_flag(row.active_account.as_deref()),
            legacy_id: row.legacy_id.unwrap_or_default().trim().to_string(),
            tma: row
                .tma
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        });
    }

    let kept_rows = users.len();
    Ok((
        users,
        LoadReport {
            total_rows,
            kept_rows,
            skipped_rows,
        },
    ))
}

fn trips_from_reader<R: Read>(reader: R) -> Result<(Vec<TripRecord>, LoadReport), ReportError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut total_rows = 0usize;
    let mut skipped_rows = 0usize;
    let mut trips: Vec<TripRecord> = Vec::new();

    for result in rdr.deserialize::<RawTripRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Skipping unreadable trip row: {}", e);
                skipped_rows += 1;
                continue;
            }
        };

        let user_id = match row.user_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                skipped_rows += 1;
                continue;
            }
        };
        let method = match row.mode.as_deref().map(str::trim) {
            Some(mode) if !mode.is_empty() => Method::from_raw(mode),
            _ => {
                skipped_rows += 1;
                continue;
            }
        };

        // Unparseable metrics degrade to zero rather than dropping the
        // log event itself.
        trips.push(TripRecord {
            user_id,
            method,
            trips: parse_f64_safe(row.trips.as_deref()).unwrap_or(0.0),
            miles: parse_f64_safe(row.miles.as_deref()).unwrap_or(0.0),
            vmr: parse_f64_safe(row.vehicle_miles_reduced.as_deref()).unwrap_or(0.0),
            co2_grams: parse_f64_safe(row.co2_grams.as_deref()).unwrap_or(0.0),
            dollars: parse_f64_safe(row.dollars.as_deref()).unwrap_or(0.0),
        });
    }

    let kept_rows = trips.len();
    Ok((
        trips,
        LoadReport {
            total_rows,
            kept_rows,
            skipped_rows,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_HEADER: &str = "_id,First Name,Last Name,Home Location Coords,Work Location Coords,Work Location,State/Fed,Created,Active Account,Legacyid,Tmas\n";

    #[test]
    fn loads_a_complete_user_row() {
        let csv = format!(
            "{}u1,Ada,Lovelace,\"-84.39,33.75\",\"-84.38,33.77\",HQ,,3/14/24 9:05 AM,1,L9,Midtown Alliance\n",
            USER_HEADER
        );
        let (users, report) = users_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(report.kept_rows, 1);
        assert_eq!(report.skipped_rows, 0);
        let u = &users[0];
        assert_eq!(u.user_id, "u1");
        assert_eq!(u.home_lon, Some(-84.39));
        assert_eq!(u.work_lat, Some(33.77));
        assert!(!u.funding_flag);
        assert!(u.active);
        assert_eq!(u.legacy_id, "L9");
        assert_eq!(u.tma.as_deref(), Some("Midtown Alliance"));
        assert!(u.created_date.is_some());
    }

    #[test]
    fn state_fed_presence_sets_the_funding_flag() {
        let csv = format!("{}u1,,,,,,GDOT,,,,\n", USER_HEADER);
        let (users, _) = users_from_reader(csv.as_bytes()).unwrap();
        assert!(users[0].funding_flag);
    }

    #[test]
    fn bad_coordinates_and_timestamps_degrade_not_fail() {
        let csv = format!("{}u1,,,garbage,\"-84.38\",,,soon,1,,\n", USER_HEADER);
        let (users, report) = users_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(report.kept_rows, 1);
        let u = &users[0];
        assert_eq!(u.home_lon, None);
        assert_eq!(u.work_lon, Some(-84.38));
        assert_eq!(u.work_lat, None);
        assert_eq!(u.created_date, None);
    }

    #[test]
    fn user_rows_without_an_id_are_skipped_and_counted() {
        let csv = format!("{},,,,,,,,,,\nu2,,,,,,,,,,\n", USER_HEADER);
        let (users, report) = users_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.skipped_rows, 1);
    }

    const TRIP_HEADER: &str =
        "User ID,Mode,Trips,Miles,Vehicle Miles Reduced,CO2 Savings (grams),Dollars Savings\n";

    #[test]
    fn loads_and_canonicalizes_trips() {
        let csv = format!("{}u1,carpool,2,10,5,2000,3\n", TRIP_HEADER);
        let (trips, report) = trips_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(report.kept_rows, 1);
        let t = &trips[0];
        assert_eq!(t.method, Method::Carpool);
        assert_eq!(t.trips, 2.0);
        assert_eq!(t.co2_grams, 2000.0);
    }

    #[test]
    fn unknown_modes_are_retained() {
        let csv = format!("{}u1,hoverboard,1,0,0,0,0\n", TRIP_HEADER);
        let (trips, _) = trips_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(trips[0].method, Method::Other("hoverboard".to_string()));
    }

    #[test]
    fn unparseable_metrics_become_zero() {
        let csv = format!("{}u1,walk,two,,,n/a,\n", TRIP_HEADER);
        let (trips, _) = trips_from_reader(csv.as_bytes()).unwrap();
        let t = &trips[0];
        assert_eq!(t.trips, 0.0);
        assert_eq!(t.co2_grams, 0.0);
    }
}
