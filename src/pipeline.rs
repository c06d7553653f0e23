// The whole run, end to end.
//
// Pure batch transform: cleaned users + cleaned trips + zone layers +
// reporting window in, four report tables out. Every stage consumes the
// complete output of the one before it; nothing here touches disk.
use crate::types::{
    AuditRow, EnrichedTrip, GdotRow, LocatedUser, TableauRow, TdmRow, TripRecord, UserRecord,
};
use crate::zones::{ZoneLayers, UNKNOWN};
use crate::{aggregate, locate, pivot, reports, territory};
use chrono::NaiveDate;
use std::collections::HashMap;

pub struct Reports {
    pub tableau: Vec<TableauRow>,
    pub gdot: Vec<GdotRow>,
    pub tdm: Vec<TdmRow>,
    pub audit: Vec<AuditRow>,
}

/// Copy each trip's classification fields from its owning user. Left
/// join: a trip whose user is missing from the Users table keeps
/// `"Unknown"` classification and lands in the combined unknown
/// territory downstream.
fn enrich_trips(trips: Vec<TripRecord>, users: &[LocatedUser]) -> Vec<EnrichedTrip> {
    let by_id: HashMap<&str, &LocatedUser> = users
        .iter()
        .map(|u| (u.user.user_id.as_str(), u))
        .collect();

    trips
        .into_iter()
        .map(|trip| match by_id.get(trip.user_id.as_str()) {
            Some(u) => EnrichedTrip {
                eso: u.work_eso.clone(),
                home_zip: u.home_zip.clone(),
                funding_adjusted: u.funding_adjusted.clone(),
                territory: u.territory.clone(),
                trip,
            },
            None => {
                let (funding_adjusted, territory) = territory::normalize(UNKNOWN, false);
                EnrichedTrip {
                    eso: UNKNOWN.to_string(),
                    home_zip: UNKNOWN.to_string(),
                    funding_adjusted,
                    territory,
                    trip,
                }
            }
        })
        .collect()
}

/// Run the full pipeline for one reporting window.
pub fn process(
    users: Vec<UserRecord>,
    trips: Vec<TripRecord>,
    layers: &ZoneLayers,
    start: NaiveDate,
    end: NaiveDate,
) -> Reports {
    let located = locate::locate_users(users, layers, start, end);
    let enriched = enrich_trips(trips, &located);

    let per_user = aggregate::per_user_mode(&enriched);
    let per_user_adjusted = aggregate::per_user_mode_adjusted(&enriched);
    let logger_counts = aggregate::logger_rollup(&per_user_adjusted);
    let totals = aggregate::territory_totals(&per_user_adjusted);
    let new_users = aggregate::new_user_counts(&located);
    let mode_logs = pivot::mode_logs_wide(&aggregate::territory_method_logs(&enriched));
    let user_wide = pivot::user_mode_wide(&per_user);

    Reports {
        tableau: reports::generate_tableau(&per_user, start),
        gdot: reports::generate_gdot(&totals, &new_users, &mode_logs, &logger_counts),
        tdm: reports::generate_tdm(&located, &user_wide, start),
        audit: reports::generate_audit(&located),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::GRAMS_TO_POUNDS;
    use crate::territory::UNKNOWN_OUT_OF_REGION;
    use crate::types::Method;
    use crate::zones::ZoneLayer;
    use geo::{LineString, MultiPolygon, Polygon};

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        )])
    }

    fn layers() -> ZoneLayers {
        let unit = || square(0.0, 0.0, 10.0, 10.0);
        ZoneLayers {
            eso: ZoneLayer::from_entries(
                "ESO",
                vec![("North".to_string(), "North".to_string(), unit())],
            )
            .unwrap(),
            county: ZoneLayer::from_entries(
                "County",
                vec![("13121".to_string(), "Fulton".to_string(), unit())],
            )
            .unwrap(),
            zcta: ZoneLayer::from_entries(
                "ZCTA",
                vec![("30309".to_string(), "30309".to_string(), unit())],
            )
            .unwrap(),
        }
    }

    fn user(id: &str, coords: Option<(f64, f64)>, funding: bool) -> UserRecord {
        UserRecord {
            user_id: id.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            home_lon: coords.map(|c| c.0),
            home_lat: coords.map(|c| c.1),
            work_lon: coords.map(|c| c.0),
            work_lat: coords.map(|c| c.1),
            work_location: String::new(),
            funding_flag: funding,
            created_raw: String::new(),
            created_date: None,
            active: true,
            legacy_id: String::new(),
            tma: None,
        }
    }

    fn trip(user: &str, method: Method, trips: f64, miles: f64, vmr: f64, co2: f64, dollars: f64) -> TripRecord {
        TripRecord {
            user_id: user.to_string(),
            method,
            trips,
            miles,
            vmr,
            co2_grams: co2,
            dollars,
        }
    }

    fn window() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[test]
    fn round_trip_two_users() {
        // A: in-region home/work, funding flag set. B: no coordinates.
        let users = vec![
            user("A", Some((5.0, 5.0)), true),
            user("B", None, false),
        ];
        let trips = vec![
            trip("A", Method::Carpool, 2.0, 10.0, 5.0, 2000.0, 3.0),
            trip("B", Method::Drive, 1.0, 0.0, 0.0, 0.0, 0.0),
        ];
        let (start, end) = window();
        let out = process(users, trips, &layers(), start, end);

        // GDOT: A's funding flag collapses to the GCO territory.
        let gco = out.gdot.iter().find(|r| r.territory == "GCO").unwrap();
        assert_eq!(gco.carpool_logs, 1);
        assert_eq!(gco.loggers, 1);
        assert_eq!(gco.clean_loggers, 1);
        assert_eq!(gco.reduced_vmt, 5.0);
        assert!((gco.reduced_co2_pounds - 2000.0 * GRAMS_TO_POUNDS).abs() < 1e-12);

        // B: drive still counts as logging, not as clean logging.
        let unknown = out
            .gdot
            .iter()
            .find(|r| r.territory == UNKNOWN_OUT_OF_REGION)
            .unwrap();
        assert_eq!(unknown.loggers, 1);
        assert_eq!(unknown.clean_loggers, 0);
        assert_eq!(unknown.carpool_logs, 0);

        // Tableau: drive rows are filtered, so only A's carpool row.
        assert_eq!(out.tableau.len(), 1);
        assert_eq!(out.tableau[0].method, "Carpool");
        assert_eq!(out.tableau[0].eso, "North");
        assert_eq!(out.tableau[0].home_zip, "30309");

        // TDM: both users are active; B is all zeros with no loggers.
        assert_eq!(out.tdm.len(), 2);
        let b = out.tdm.iter().find(|r| r.user_id == "B").unwrap();
        assert_eq!(b.zip_code_home, UNKNOWN);
        assert!(b.modes.iter().all(|s| s.trips == 0.0));
        assert_eq!(b.clean.logger, None);
        let a = out.tdm.iter().find(|r| r.user_id == "A").unwrap();
        assert_eq!(a.clean.trips, 2.0);
        assert_eq!(a.eso, "North");

        // Audit: A's geocoded area disagrees with the missing TMA;
        // B collapses to Unknown/Out of Region on both sides.
        assert_eq!(out.audit.len(), 1);
        assert_eq!(out.audit[0].user_id, "A");
    }

    #[test]
    fn orphan_trips_resolve_to_the_unknown_territory() {
        let trips = vec![trip("ghost", Method::Walk, 1.0, 1.0, 1.0, 100.0, 1.0)];
        let (start, end) = window();
        let out = process(Vec::new(), trips, &layers(), start, end);

        // No users at all: the unknown territory is missing from the
        // new-user counts, so the GDOT inner join drops it entirely,
        // but the trip still reaches the Tableau extract as Unknown.
        assert!(out.gdot.is_empty());
        assert_eq!(out.tableau.len(), 1);
        assert_eq!(out.tableau[0].eso, UNKNOWN);

        // With one unclassifiable user present, the territory exists in
        // every source and the orphan's logs are counted there.
        let out = process(
            vec![user("C", None, false)],
            vec![trip("ghost", Method::Walk, 1.0, 1.0, 1.0, 100.0, 1.0)],
            &layers(),
            start,
            end,
        );
        let unknown = out
            .gdot
            .iter()
            .find(|r| r.territory == UNKNOWN_OUT_OF_REGION)
            .unwrap();
        assert_eq!(unknown.walk_logs, 1);
        assert_eq!(unknown.loggers, 1);
    }

    #[test]
    fn aggregation_conserves_territory_metric_sums() {
        let users = vec![
            user("A", Some((5.0, 5.0)), false),
            user("B", Some((5.0, 5.0)), true),
        ];
        let trips = vec![
            trip("A", Method::Bike, 2.0, 8.0, 4.0, 1000.0, 2.0),
            trip("A", Method::Walk, 1.0, 2.0, 1.0, 500.0, 1.0),
            trip("B", Method::Transit, 3.0, 30.0, 15.0, 2500.0, 5.0),
        ];
        let (start, end) = window();
        let out = process(users, trips, &layers(), start, end);

        let total_vmr: f64 = out.gdot.iter().map(|r| r.reduced_vmt).sum();
        assert_eq!(total_vmr, 20.0);
        let total_co2: f64 = out.gdot.iter().map(|r| r.reduced_co2_pounds).sum();
        assert!((total_co2 - 4000.0 * GRAMS_TO_POUNDS).abs() < 1e-12);
    }
}
