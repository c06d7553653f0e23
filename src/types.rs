use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

#[derive(Debug, Deserialize)]
pub struct RawUserRow {
    #[serde(rename = "_id")]
    pub user_id: Option<String>,
    #[serde(rename = "First Name")]
    pub first_name: Option<String>,
    #[serde(rename = "Last Name")]
    pub last_name: Option<String>,
    #[serde(rename = "Home Location Coords")]
    pub home_coords: Option<String>,
    #[serde(rename = "Work Location Coords")]
    pub work_coords: Option<String>,
    #[serde(rename = "Work Location")]
    pub work_location: Option<String>,
    #[serde(rename = "State/Fed")]
    pub state_fed: Option<String>,
    #[serde(rename = "Created")]
    pub created: Option<String>,
    #[serde(rename = "Active Account")]
    pub active_account: Option<String>,
    #[serde(rename = "Legacyid")]
    pub legacy_id: Option<String>,
    #[serde(rename = "Tmas")]
    pub tma: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawTripRow {
    #[serde(rename = "User ID")]
    pub user_id: Option<String>,
    #[serde(rename = "Mode")]
    pub mode: Option<String>,
    #[serde(rename = "Trips")]
    pub trips: Option<String>,
    #[serde(rename = "Miles")]
    pub miles: Option<String>,
    #[serde(rename = "Vehicle Miles Reduced")]
    pub vehicle_miles_reduced: Option<String>,
    #[serde(rename = "CO2 Savings (grams)")]
    pub co2_grams: Option<String>,
    #[serde(rename = "Dollars Savings")]
    pub dollars: Option<String>,
}

/// One enrolled participant, cleaned but not yet classified.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub home_lon: Option<f64>,
    pub home_lat: Option<f64>,
    pub work_lon: Option<f64>,
    pub work_lat: Option<f64>,
    pub work_location: String,
    /// Presence of any State/Fed value marks the funding-source override.
    pub funding_flag: bool,
    pub created_raw: String,
    pub created_date: Option<NaiveDate>,
    pub active: bool,
    pub legacy_id: String,
    /// Self-reported service area, kept for the audit report.
    pub tma: Option<String>,
}

/// A user after zone classification and territory normalization.
#[derive(Debug, Clone)]
pub struct LocatedUser {
    pub user: UserRecord,
    pub work_eso: String,
    pub work_zip: String,
    pub work_county_name: String,
    pub work_county_fips: String,
    pub home_eso: String,
    pub home_zip: String,
    pub home_county_name: String,
    pub home_county_fips: String,
    pub funding_adjusted: String,
    pub territory: String,
    pub is_new_user: bool,
}

/// One logged trip-method event.
#[derive(Debug, Clone)]
pub struct TripRecord {
    pub user_id: String,
    pub method: Method,
    pub trips: f64,
    pub miles: f64,
    pub vmr: f64,
    pub co2_grams: f64,
    pub dollars: f64,
}

/// A trip with classification fields copied in from its owning user.
/// Trips whose user is missing from the Users table keep `"Unknown"`
/// in every classification field.
#[derive(Debug, Clone)]
pub struct EnrichedTrip {
    pub trip: TripRecord,
    pub eso: String,
    pub home_zip: String,
    pub funding_adjusted: String,
    pub territory: String,
}

/// Commute method. The source system exports lowercase codes; anything
/// outside the known set is retained as-is so upstream data-quality
/// problems stay visible in the output rather than vanishing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    Bike,
    Carpool,
    Cww,
    Drive,
    Scooter,
    Telework,
    Transit,
    Vanpool,
    Walk,
    Other(String),
}

/// The eight non-drive modes, in output column order.
pub const CLEAN_MODES: [Method; 8] = [
    Method::Bike,
    Method::Carpool,
    Method::Cww,
    Method::Scooter,
    Method::Telework,
    Method::Transit,
    Method::Vanpool,
    Method::Walk,
];

impl Method {
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bike" => Self::Bike,
            "carpool" => Self::Carpool,
            "cww" => Self::Cww,
            "drive" => Self::Drive,
            "scooter" => Self::Scooter,
            "telework" => Self::Telework,
            "transit" => Self::Transit,
            "vanpool" => Self::Vanpool,
            "walk" => Self::Walk,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Bike => "Bike",
            Self::Carpool => "Carpool",
            Self::Cww => "CWW",
            Self::Drive => "Drive",
            Self::Scooter => "Scooter",
            Self::Telework => "Telework",
            Self::Transit => "Transit",
            Self::Vanpool => "Vanpool",
            Self::Walk => "Walk",
            Self::Other(s) => s,
        }
    }

    pub fn is_drive(&self) -> bool {
        matches!(self, Self::Drive)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TableauRow {
    #[serde(rename = "Date")]
    #[tabled(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Home ZIP")]
    #[tabled(rename = "Home ZIP")]
    pub home_zip: String,
    #[serde(rename = "ESO")]
    #[tabled(rename = "ESO")]
    pub eso: String,
    #[serde(rename = "Method")]
    #[tabled(rename = "Method")]
    pub method: String,
    #[serde(rename = "Trips")]
    #[tabled(rename = "Trips")]
    pub trips: f64,
    #[serde(rename = "Miles")]
    #[tabled(rename = "Miles")]
    pub miles: f64,
    #[serde(rename = "VMR")]
    #[tabled(rename = "VMR")]
    pub vmr: f64,
    #[serde(rename = "CO2")]
    #[tabled(rename = "CO2")]
    pub co2: f64,
    #[serde(rename = "Dollars")]
    #[tabled(rename = "Dollars")]
    pub dollars: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GdotRow {
    #[serde(rename = "Territory")]
    #[tabled(rename = "Territory")]
    pub territory: String,
    #[serde(rename = "New Users")]
    #[tabled(rename = "New Users")]
    pub new_users: i64,
    #[serde(rename = "Loggers")]
    #[tabled(rename = "Loggers")]
    pub loggers: i64,
    #[serde(rename = "Clean Loggers")]
    #[tabled(rename = "Clean Loggers")]
    pub clean_loggers: i64,
    #[serde(rename = "Carpool Logs")]
    #[tabled(rename = "Carpool Logs")]
    pub carpool_logs: i64,
    #[serde(rename = "Vanpool Logs")]
    #[tabled(rename = "Vanpool Logs")]
    pub vanpool_logs: i64,
    #[serde(rename = "Transit Logs")]
    #[tabled(rename = "Transit Logs")]
    pub transit_logs: i64,
    #[serde(rename = "Telework Logs")]
    #[tabled(rename = "Telework Logs")]
    pub telework_logs: i64,
    #[serde(rename = "Walk Logs")]
    #[tabled(rename = "Walk Logs")]
    pub walk_logs: i64,
    #[serde(rename = "Bike Logs")]
    #[tabled(rename = "Bike Logs")]
    pub bike_logs: i64,
    #[serde(rename = "Scooter Logs")]
    #[tabled(rename = "Scooter Logs")]
    pub scooter_logs: i64,
    #[serde(rename = "CWW Logs")]
    #[tabled(rename = "CWW Logs")]
    pub cww_logs: i64,
    #[serde(rename = "Reduced VMT")]
    #[tabled(rename = "Reduced VMT")]
    pub reduced_vmt: f64,
    #[serde(rename = "Reduced CO2 (pounds)")]
    #[tabled(rename = "Reduced CO2 (pounds)")]
    pub reduced_co2_pounds: f64,
    #[serde(rename = "Money Saved")]
    #[tabled(rename = "Money Saved")]
    pub money_saved: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AuditRow {
    #[serde(rename = "User ID")]
    #[tabled(rename = "User ID")]
    pub user_id: String,
    #[serde(rename = "First Name")]
    #[tabled(rename = "First Name")]
    pub first_name: String,
    #[serde(rename = "Last Name")]
    #[tabled(rename = "Last Name")]
    pub last_name: String,
    #[serde(rename = "Work Location")]
    #[tabled(rename = "Work Location")]
    pub work_location: String,
    #[serde(rename = "TMA")]
    #[tabled(rename = "TMA")]
    pub tma: String,
    #[serde(rename = "ESO Geocoded")]
    #[tabled(rename = "ESO Geocoded")]
    pub eso_geocoded: String,
}

/// One mode's block of columns in the TDM extract.
#[derive(Debug, Clone, Default)]
pub struct ModeStats {
    /// `Some(1)` if the user ever logged this mode; absent (empty cell)
    /// otherwise. Never zero: absence distinguishes "never logged" from
    /// "logged zero".
    pub logger: Option<u8>,
    pub trips: f64,
    pub miles: f64,
    pub vmr: f64,
    pub co2_lbs: f64,
    pub dollars: f64,
}

/// One row of the per-user TDM extract. The mode blocks are positional,
/// aligned with [`CLEAN_MODES`]; the column set is generated rather than
/// declared field-by-field because it repeats per mode.
#[derive(Debug, Clone)]
pub struct TdmRow {
    pub user_id: String,
    pub home_x: Option<f64>,
    pub home_y: Option<f64>,
    pub work_x: Option<f64>,
    pub work_y: Option<f64>,
    pub tma: String,
    pub legacy: Option<u8>,
    pub active: u8,
    pub new_user: u8,
    pub created_date: String,
    pub modes: [ModeStats; 8],
    pub clean: ModeStats,
    pub month: NaiveDate,
    pub county_id_work: String,
    pub county_work: String,
    pub zip_code_work: String,
    pub eso: String,
    pub county_id_home: String,
    pub county_home: String,
    pub zip_code_home: String,
}

/// Headline numbers for one run, written alongside the four reports.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub users: usize,
    pub trips: usize,
    pub tableau_rows: usize,
    pub gdot_territories: usize,
    pub tdm_rows: usize,
    pub audit_discrepancies: usize,
    pub total_reduced_vmt: f64,
    pub total_money_saved: f64,
}

fn cell_f64(v: f64) -> String {
    v.to_string()
}

fn cell_opt_f64(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn cell_opt_u8(v: Option<u8>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

impl TdmRow {
    pub fn headers() -> Vec<String> {
        let mut cols: Vec<String> = [
            "User_ID",
            "Home_X",
            "Home_Y",
            "Work_X",
            "Work_Y",
            "TMA",
            "Legacy",
            "Active",
            "New",
            "Created_Date",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        for mode in &CLEAN_MODES {
            for metric in ["Logger", "Trips", "Miles", "VMR", "CO2_lbs", "Dollars"] {
                cols.push(format!("{}_{}", mode.label(), metric));
            }
        }
        for metric in ["Logger", "Trips", "Miles", "VMR", "CO2_lbs", "Dollars"] {
            cols.push(format!("Clean_{}", metric));
        }
        cols.extend(
            [
                "Month",
                "County_ID_Work",
                "County_Work",
                "Zip_Code_Work",
                "ESO",
                "County_ID_Home",
                "County_Home",
                "Zip_Code_Home",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        cols
    }

    pub fn record(&self) -> Vec<String> {
        let mut rec = vec![
            self.user_id.clone(),
            cell_opt_f64(self.home_x),
            cell_opt_f64(self.home_y),
            cell_opt_f64(self.work_x),
            cell_opt_f64(self.work_y),
            self.tma.clone(),
            cell_opt_u8(self.legacy),
            self.active.to_string(),
            self.new_user.to_string(),
            self.created_date.clone(),
        ];
        for stats in self.modes.iter().chain(std::iter::once(&self.clean)) {
            rec.push(cell_opt_u8(stats.logger));
            rec.push(cell_f64(stats.trips));
            rec.push(cell_f64(stats.miles));
            rec.push(cell_f64(stats.vmr));
            rec.push(cell_f64(stats.co2_lbs));
            rec.push(cell_f64(stats.dollars));
        }
        rec.push(self.month.to_string());
        rec.push(self.county_id_work.clone());
        rec.push(self.county_work.clone());
        rec.push(self.zip_code_work.clone());
        rec.push(self.eso.clone());
        rec.push(self.county_id_home.clone());
        rec.push(self.county_home.clone());
        rec.push(self.zip_code_home.clone());
        rec
    }
}
