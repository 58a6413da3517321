//! Common test fixtures for WRF post-processing tests.
//!
//! Plain data only, so any crate in the workspace can use it without
//! depending on the library under test.

/// WRF history file naming.
pub mod files {
    /// Domain 1 history file for the given hour of 2024-06-01.
    pub fn wrfout_name(hour: u32) -> String {
        format!("wrfout_d01_2024-06-01_{:02}:00:00", hour)
    }

    /// Names for `count` consecutive hourly files starting at hour 0.
    pub fn hourly_names(count: u32) -> Vec<String> {
        (0..count).map(wrfout_name).collect()
    }

    /// Title WRF writes into history files.
    pub const WRF_TITLE: &str = " OUTPUT FROM WRF V4.5 MODEL";
}

/// Grid sizes used across tests.
pub mod grid {
    /// Grid specification for testing.
    #[derive(Debug, Clone, Copy)]
    pub struct GridSpec {
        pub south_north: usize,
        pub west_east: usize,
    }

    impl GridSpec {
        /// Returns the total number of grid cells.
        pub fn size(&self) -> usize {
            self.south_north * self.west_east
        }
    }

    /// One grid point.
    pub const SCALAR: GridSpec = GridSpec {
        south_north: 1,
        west_east: 1,
    };

    /// Small rectangular grid; rows and columns differ to catch transposition.
    pub const SMALL: GridSpec = GridSpec {
        south_north: 4,
        west_east: 6,
    };
}

/// Precipitation variable names.
pub mod fields {
    /// A five-field candidate list.
    pub const FIVE_CANDIDATES: [&str; 5] = ["RAINC", "RAINSH", "RAINNC", "SNOWNC", "GRAUPELNC"];

    /// Derived field name.
    pub const PRECIP_H: &str = "PRECIP_H";
}

/// `XTIME` values (minutes since simulation start).
pub mod time {
    /// Standard output interval.
    pub const HOURLY: f64 = 60.0;
}
