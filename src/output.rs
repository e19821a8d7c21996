// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use std::io::Write;

use crate::utils::CsvFriend;

/// A metric sample produced by an event handler.
#[derive(Debug)]
pub enum Sample {
    ScalarOneTime(String, f64),
    ScalarAvg(String, f64),
    ScalarTimeAvg(String, f64),
    ScalarCount(String),
}

#[derive(Default)]
struct Count {
    num: u64,
}

impl Count {
    pub fn add(&mut self) {
        self.num += 1;
    }
    pub fn tot(&self) -> f64 {
        self.num as f64
    }
}

#[derive(Default)]
struct Avg {
    sum: kahan::KahanSum<f64>,
    num: u64,
}

impl Avg {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.num += 1;
    }
    pub fn avg(&self) -> f64 {
        self.sum.sum() / self.num as f64
    }
}

struct TimeAvg {
    last_update: u64,
    last_value: f64,
    sum_values: f64,
    sum_time: f64,
}

impl Default for TimeAvg {
    fn default() -> Self {
        Self {
            last_update: u64::MAX,
            last_value: 0.0,
            sum_values: 0.0,
            sum_time: 0.0,
        }
    }
}

impl TimeAvg {
    pub fn add(&mut self, now: u64, value: f64) {
        if self.last_update != u64::MAX {
            let delta = (now - self.last_update) as f64;
            self.sum_values += delta * self.last_value;
            self.sum_time += delta;
        }
        self.last_update = now;
        self.last_value = value;
    }
    pub fn finish(&mut self, now: u64) {
        self.add(now, self.last_value);
    }
    pub fn avg(&self) -> f64 {
        self.sum_values / self.sum_time
    }
}

/// Scalar metrics of a single run, one value per metric.
#[derive(Default)]
pub struct OutputScalar {
    one_time: std::collections::BTreeMap<String, f64>,
    avg: std::collections::BTreeMap<String, Avg>,
    time_avg: std::collections::BTreeMap<String, TimeAvg>,
    count: std::collections::BTreeMap<String, Count>,
}

pub enum ScalarMetricType {
    Avg,
    TimeAvg,
    Count,
}

impl OutputScalar {
    /// Metrics must be initialized before the run so that all the runs in a
    /// batch serialize the same columns, even those never sampled.
    pub fn init(&mut self, name: &str, metric_type: ScalarMetricType) {
        match metric_type {
            ScalarMetricType::Avg => {
                self.avg.insert(name.to_string(), Avg::default());
            }
            ScalarMetricType::TimeAvg => {
                self.time_avg.insert(name.to_string(), TimeAvg::default());
            }
            ScalarMetricType::Count => {
                self.count.insert(name.to_string(), Count::default());
            }
        };
    }

    pub fn one_time(&mut self, name: &str, value: f64) {
        self.one_time.insert(name.to_string(), value);
    }

    pub fn avg(&mut self, name: &str, value: f64) {
        self.avg
            .get_mut(name)
            .unwrap_or_else(|| panic!("uninitialized metric {name}"))
            .add(value);
    }

    pub fn time_avg(&mut self, name: &str, now: u64, value: f64) {
        self.time_avg
            .get_mut(name)
            .unwrap_or_else(|| panic!("uninitialized metric {name}"))
            .add(now, value);
    }

    pub fn count(&mut self, name: &str) {
        self.count
            .get_mut(name)
            .unwrap_or_else(|| panic!("uninitialized metric {name}"))
            .add();
    }

    /// Close the time-weighted averages at the end of the run.
    pub fn finish(&mut self, now: u64) {
        for elem in &mut self.time_avg.values_mut() {
            elem.finish(now);
        }
    }
}

impl CsvFriend for OutputScalar {
    fn header(&self) -> String {
        format!(
            "{},{},{},{}",
            self.one_time
                .keys()
                .cloned()
                .collect::<Vec<String>>()
                .join(","),
            self.avg.keys().cloned().collect::<Vec<String>>().join(","),
            self.time_avg
                .keys()
                .cloned()
                .collect::<Vec<String>>()
                .join(","),
            self.count
                .keys()
                .cloned()
                .collect::<Vec<String>>()
                .join(",")
        )
    }
    fn to_csv(&self) -> String {
        format!(
            "{},{},{},{}",
            self.one_time
                .values()
                .map(|x| x.to_string())
                .collect::<Vec<String>>()
                .join(","),
            self.avg
                .values()
                .map(|x| x.avg().to_string())
                .collect::<Vec<String>>()
                .join(","),
            self.time_avg
                .values()
                .map(|x| x.avg().to_string())
                .collect::<Vec<String>>()
                .join(","),
            self.count
                .values()
                .map(|x| x.tot().to_string())
                .collect::<Vec<String>>()
                .join(",")
        )
    }
}

#[derive(Default)]
pub struct OutputSeriesSingle {
    /// CSV headers, which explain the meaning of the labels.
    pub headers: Vec<String>,
    /// Time series. Each sample is associated with:
    /// - a vector of string labels
    /// - the time when the sample was collected
    /// - the value of the sample
    pub values: Vec<(Vec<String>, f64, f64)>,
}

/// Series of values. Each series is associated with a name and a set of
/// labels, one per header.
#[derive(Default)]
pub struct OutputSeries {
    ignore: std::collections::HashSet<String>,
    pub series: std::collections::HashMap<String, OutputSeriesSingle>,
}

impl OutputSeries {
    pub fn new(ignore: std::collections::HashSet<String>) -> Self {
        Self {
            ignore,
            series: std::collections::HashMap::new(),
        }
    }

    /// Add a new value to a series metric, unless the metric is ignored.
    ///
    /// The function panics if the headers have not been set or if the number
    /// of labels is different from the number of elements expected based on
    /// the headers.
    pub fn add(&mut self, name: &str, labels: Vec<String>, time: f64, value: f64) {
        if !self.ignore.contains(name) {
            let series_single = self
                .series
                .get_mut(name)
                .unwrap_or_else(|| panic!("uninitialized metric {name}"));
            assert!(
                series_single.headers.len() == labels.len(),
                "wrong numbers of labels for metric {}: expected {}, found {}",
                name,
                series_single.headers.len(),
                labels.len()
            );
            series_single.values.push((labels, time, value));
        }
    }

    /// Set the headers for a given metric and reset any previous values.
    pub fn set_headers(&mut self, name: &str, headers: &[&str]) {
        if !self.ignore.contains(name) {
            let series_single = self.series.entry(name.to_string()).or_default();
            series_single.headers = headers.iter().map(|x| x.to_string()).collect();
            series_single.values.clear();
        }
    }
}

/// The full output of a single run.
pub struct Output {
    pub scalar: OutputScalar,
    pub series: OutputSeries,
    pub config_csv: String,
}

/// Save all the outputs to files.
pub fn save_outputs(
    outputs: Vec<Output>,
    output_path: &str,
    append: bool,
    config_csv_header: &str,
    additional_header: &str,
    additional_fields: &str,
    save_config: bool,
) -> anyhow::Result<()> {
    let header_comma = if additional_header.is_empty() {
        ""
    } else {
        ","
    };

    // Open all the files.
    let mut scalar_file = crate::utils::open_output_file(
        output_path,
        "scalar.csv",
        append,
        format!(
            "{}{}{}{}{}",
            additional_header,
            header_comma,
            if save_config { config_csv_header } else { "" },
            if save_config { "," } else { "" },
            outputs.first().unwrap().scalar.header()
        )
        .as_str(),
    )?;
    let mut series_files = std::collections::HashMap::new();
    for output in &outputs {
        for (name, elem) in &output.series.series {
            if elem.values.is_empty() || series_files.contains_key(name) {
                continue;
            }
            let series_file = crate::utils::open_output_file(
                output_path,
                format!("{name}.csv").as_str(),
                append,
                format!(
                    "{}{}{}{}{},time,value",
                    additional_header,
                    header_comma,
                    if save_config { &config_csv_header } else { "" },
                    if save_config { "," } else { "" },
                    elem.headers.join(",")
                )
                .as_str(),
            )?;
            series_files.insert(name.clone(), series_file);
        }
    }

    // Dump the data to files.
    for output in outputs {
        let config_csv = if save_config { &output.config_csv } else { "" };
        let config_comma = if save_config { "," } else { "" };
        writeln!(
            &mut scalar_file,
            "{}{}{}{}{}",
            additional_fields,
            header_comma,
            config_csv,
            config_comma,
            output.scalar.to_csv()
        )?;

        for (name, elem) in &output.series.series {
            if let Some(series_file) = series_files.get_mut(name) {
                for (labels, time, value) in &elem.values {
                    writeln!(
                        series_file,
                        "{}{}{}{}{},{},{}",
                        additional_fields,
                        header_comma,
                        config_csv,
                        config_comma,
                        labels.join(","),
                        time,
                        value
                    )?;
                }
            }
        }
    }

    Ok(())
}
