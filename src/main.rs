// Entry point and high-level CLI flow.
//
// - Option [1] loads and cleans both input files and the three zone
//   layers, printing diagnostics.
// - Option [2] asks for the reporting window, runs the pipeline, and
//   writes the four reports plus a JSON summary.
// - After generating reports, the user can choose to go back to the
//   selection menu or exit.
mod aggregate;
mod error;
mod loader;
mod locate;
mod output;
mod pipeline;
mod pivot;
mod reports;
mod territory;
mod types;
mod util;
mod zones;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::Mutex;
use types::{RunSummary, TdmRow, TripRecord, UserRecord};
use zones::ZoneLayers;

const USERS_PATH: &str = "data/users.csv";
const TRIPS_PATH: &str = "data/trips.csv";
const ESO_PATH: &str = "data/employer_service_organizations.geojson";
const COUNTY_PATH: &str = "data/tl_2020_13_county20.geojson";
const ZCTA_PATH: &str = "data/tl_2020_13_zcta520.geojson";

// Simple in-memory app state so we only load the inputs once but can
// generate reports for several windows in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        inputs: None,
    })
});

struct Inputs {
    users: Vec<UserRecord>,
    trips: Vec<TripRecord>,
    layers: ZoneLayers,
}

struct AppState {
    inputs: Option<Inputs>,
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Prompt for a `YYYY-MM-DD` date until one parses.
fn read_date(prompt: &str) -> NaiveDate {
    loop {
        print!("{} (YYYY-MM-DD): ", prompt);
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        if let Some(d) = util::parse_date_safe(Some(&buf)) {
            return d;
        }
        println!("Invalid date. Please use YYYY-MM-DD.");
    }
}

/// Ask the user whether to go back to the report selection menu after
/// generating reports.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        let resp = buf.trim().to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: load the user and trip extracts and the three
/// zone layers.
///
/// On success the cleaned inputs are stored in `APP_STATE` and a short
/// textual summary of what happened is printed.
fn handle_load() {
    let (users, user_report) = match loader::load_users(USERS_PATH) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load {}: {}\n", USERS_PATH, e);
            return;
        }
    };
    println!(
        "Users: {} rows loaded, {} kept, {} skipped.",
        util::format_int(user_report.total_rows as i64),
        util::format_int(user_report.kept_rows as i64),
        util::format_int(user_report.skipped_rows as i64)
    );

    let (trips, trip_report) = match loader::load_trips(TRIPS_PATH) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load {}: {}\n", TRIPS_PATH, e);
            return;
        }
    };
    println!(
        "Trips: {} rows loaded, {} kept, {} skipped.",
        util::format_int(trip_report.total_rows as i64),
        util::format_int(trip_report.kept_rows as i64),
        util::format_int(trip_report.skipped_rows as i64)
    );

    let layers = match ZoneLayers::load(ESO_PATH, COUNTY_PATH, ZCTA_PATH) {
        Ok(layers) => layers,
        Err(e) => {
            eprintln!("Failed to load zone layers: {}\n", e);
            return;
        }
    };
    println!("Zone layers ready.\n");

    let mut state = APP_STATE.lock().unwrap();
    state.inputs = Some(Inputs {
        users,
        trips,
        layers,
    });
}

/// Handle option [2]: run the pipeline for one reporting window and
/// export the four reports plus the JSON summary.
fn handle_generate_reports() {
    let state = APP_STATE.lock().unwrap();
    let Some(inputs) = state.inputs.as_ref() else {
        println!("Error: No data loaded. Please load the input files first (option 1).\n");
        return;
    };

    let start = read_date("First date of the reporting period");
    let end = read_date("Last date of the reporting period");
    if end < start {
        println!("Error: reporting period ends before it starts.\n");
        return;
    }

    println!(
        "\nProcessing records for {} through {}...\n",
        start, end
    );
    let out = pipeline::process(
        inputs.users.clone(),
        inputs.trips.clone(),
        &inputs.layers,
        start,
        end,
    );

    let tableau_file = "tableau.csv";
    if let Err(e) = output::write_csv(tableau_file, &out.tableau) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 1: Tableau Extract (by Home ZIP / ESO / Method)\n");
    output::preview_table_rows(&out.tableau, 3);
    println!("(Full table exported to {})\n", tableau_file);

    let gdot_file = "gdot_report.csv";
    if let Err(e) = output::write_csv(gdot_file, &out.gdot) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 2: GDOT Summary (one row per Territory)\n");
    output::preview_table_rows(&out.gdot, 5);
    println!("(Full table exported to {})\n", gdot_file);

    let tdm_file = "tdm.csv";
    let headers = TdmRow::headers();
    if let Err(e) = output::write_csv_records(
        tdm_file,
        &headers,
        out.tdm.iter().map(TdmRow::record),
    ) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 3: TDM Extract (one row per active user)");
    println!(
        "({} rows x {} columns exported to {})\n",
        util::format_int(out.tdm.len() as i64),
        headers.len(),
        tdm_file
    );

    let audit_file = "eso_audit.csv";
    if let Err(e) = output::write_csv(audit_file, &out.audit) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 4: ESO Audit (geocoded vs self-reported discrepancies)\n");
    output::preview_table_rows(&out.audit, 3);
    println!("(Full table exported to {})\n", audit_file);

    let summary = RunSummary {
        users: inputs.users.len(),
        trips: inputs.trips.len(),
        tableau_rows: out.tableau.len(),
        gdot_territories: out.gdot.len(),
        tdm_rows: out.tdm.len(),
        audit_discrepancies: out.audit.len(),
        total_reduced_vmt: out.gdot.iter().map(|r| r.reduced_vmt).sum(),
        total_money_saved: out.gdot.iter().map(|r| r.money_saved).sum(),
    };
    if let Err(e) = output::write_json("summary.json", &summary) {
        eprintln!("Write error: {}", e);
    }
    println!(
        "Summary (summary.json): {} TDM rows, {} audit discrepancies, Reduced VMT {}, Money Saved {}.\n",
        util::format_int(summary.tdm_rows as i64),
        util::format_int(summary.audit_discrepancies as i64),
        util::format_number(summary.total_reduced_vmt, 2),
        util::format_number(summary.total_money_saved, 2)
    );
}

fn main() {
    pretty_env_logger::init();
    loop {
        println!("RideAmigos Report Processing:");
        println!("[1] Load the input files");
        println!("[2] Generate Reports\n");
        match read_choice().as_str() {
            "1" => {
                handle_load();
            }
            "2" => {
                println!("");
                handle_generate_reports();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}
