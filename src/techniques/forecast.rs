//! Daily time-series forecasting with an additive linear trend.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::encode::{Raw, Report};
use crate::error::TechniqueError;
use crate::params::Params;
use crate::table::{DataFrame, Datum};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

fn parse_date(value: &Datum) -> Option<NaiveDate> {
    match value {
        Datum::Date(d) => Some(*d),
        Datum::Text(text) => {
            let trimmed = text.trim();
            for format in DATE_FORMATS {
                if let Ok(d) = NaiveDate::parse_from_str(trimmed, format) {
                    return Some(d);
                }
            }
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        }
        _ => None,
    }
}

/// Positional contract inherited from the original module: the first column
/// is the date axis, the second the numeric target. The horizon continues
/// daily from the last parseable date, one trend step per day.
pub fn prophet_forecasting(df: &DataFrame, params: &Params) -> Result<Report, TechniqueError> {
    let columns = df.columns();
    if columns.len() < 2 {
        return Err(TechniqueError::computation(
            "Dataset must have at least 2 columns (date/time + numeric target).",
        ));
    }

    let values: Vec<f64> = columns[1].values.iter().filter_map(Datum::as_f64).collect();
    if values.is_empty() {
        return Err(TechniqueError::computation(
            "No valid numeric values in target column",
        ));
    }

    let last_date = columns[0]
        .values
        .iter()
        .filter_map(parse_date)
        .next_back()
        .ok_or_else(|| {
            TechniqueError::computation("no parseable dates in the first column")
        })?;

    let periods = params.get_usize("periods", 30);
    let last_value = values[values.len() - 1];
    let trend = if values.len() > 1 {
        (last_value - values[0]) / values.len() as f64
    } else {
        0.0
    };

    let forecast: Vec<Raw> = (1..=periods)
        .map(|step| {
            Raw::map([
                ("ds", Raw::Date(last_date + Duration::days(step as i64))),
                ("yhat", Raw::Float(last_value + trend * step as f64)),
            ])
        })
        .collect();
    let tail = forecast.len().saturating_sub(10);
    let last_forecast = Raw::Seq(forecast[tail..].to_vec());

    Ok(Report::new(
        "Forecasts future values with an additive linear trend fitted to the observed series, \
         projecting one step per day beyond the last observation.",
    )
    .chart("forecast", Raw::Seq(forecast))
    .stat("total_forecasted_days", periods)
    .table("last_forecast", last_forecast))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    fn series() -> DataFrame {
        let mut csv = String::from("ds,value\n");
        for day in 1..=10 {
            csv.push_str(&format!("2024-01-{day:02},{}\n", day * 2));
        }
        DataFrame::from_csv(&csv).unwrap()
    }

    #[test]
    fn forecast_continues_from_the_last_date() {
        let report = prophet_forecasting(&series(), &Params::new()).unwrap();
        assert_eq!(report.stats.get("total_forecasted_days"), Some(&Raw::Int(30)));
        let Some(Raw::Seq(forecast)) = report.charts.get("forecast") else {
            panic!("forecast missing")
        };
        assert_eq!(forecast.len(), 30);
        let Raw::Map(first) = &forecast[0] else { panic!("row must be a map") };
        assert_eq!(
            first.get("ds"),
            Some(&Raw::Date(NaiveDate::from_ymd_opt(2024, 1, 11).unwrap()))
        );
        // Trend (20 - 2) / 10 = 1.8 per day continues past the last value.
        let Some(Raw::Float(yhat)) = first.get("yhat") else { panic!("yhat missing") };
        assert!((yhat - 21.8).abs() < 1e-9);
    }

    #[test]
    fn horizon_is_parameterized() {
        let mut params = Params::new();
        params.insert("periods", ParamValue::Int(5));
        let report = prophet_forecasting(&series(), &params).unwrap();
        let Some(Raw::Seq(forecast)) = report.charts.get("forecast") else {
            panic!("forecast missing")
        };
        assert_eq!(forecast.len(), 5);
        let Some(Raw::Seq(tail)) = report.tables.get("last_forecast") else {
            panic!("tail missing")
        };
        assert_eq!(tail.len(), 5);
    }

    #[test]
    fn unparseable_dates_are_an_error() {
        let df = DataFrame::from_csv("ds,value\nfoo,1\nbar,2\n").unwrap();
        let err = prophet_forecasting(&df, &Params::new()).unwrap_err();
        assert!(err.to_string().contains("parseable dates"));
    }

    #[test]
    fn single_column_dataset_is_rejected() {
        let df = DataFrame::from_csv("value\n1\n2\n").unwrap();
        assert!(prophet_forecasting(&df, &Params::new()).is_err());
    }

    #[test]
    fn two_runs_are_identical() {
        let a = prophet_forecasting(&series(), &Params::new()).unwrap();
        let b = prophet_forecasting(&series(), &Params::new()).unwrap();
        assert_eq!(a.charts, b.charts);
        assert_eq!(a.tables, b.tables);
    }
}
