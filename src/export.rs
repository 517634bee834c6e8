//! Dashboard and metric export to JSON, CSV and XML

use crate::error::ExportError;
use crate::events::{ArchitectureMetric, MonitoringAlert, MonitoringEvent};
use crate::monitor::{DashboardSnapshot, TrendBucket};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

const METRIC_HEADER: &str =
    "name,value,unit,category,trend,warning_threshold,critical_threshold,timestamp";
const ALERT_HEADER: &str = "id,type,severity,title,source,timestamp,resolved,resolved_by";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Xml,
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    /// Format names are matched case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "xml" => Ok(ExportFormat::Xml),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Xml => "xml",
        };
        write!(f, "{}", name)
    }
}

/// Render a dashboard snapshot
///
/// CSV output holds two tables separated by a blank line: the metrics, then
/// the active alerts.
pub fn export_dashboard(
    dashboard: &DashboardSnapshot,
    format: ExportFormat,
) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(dashboard)?),
        ExportFormat::Csv => {
            let mut out = metrics_csv(&dashboard.metrics);
            out.push('\n');
            out.push_str(&alerts_csv(&dashboard.alerts));
            Ok(out)
        }
        ExportFormat::Xml => dashboard_xml(dashboard),
    }
}

/// Render a list of metrics
pub fn export_metrics(
    metrics: &[ArchitectureMetric],
    format: ExportFormat,
) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(metrics)?),
        ExportFormat::Csv => Ok(metrics_csv(metrics)),
        ExportFormat::Xml => {
            let mut xml = XmlBuilder::new()?;
            write_metrics(&mut xml, metrics)?;
            xml.finish()
        }
    }
}

/// Quote a CSV field when it contains a delimiter, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[String]) -> String {
    let mut row = fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",");
    row.push('\n');
    row
}

fn metrics_csv(metrics: &[ArchitectureMetric]) -> String {
    let mut out = format!("{}\n", METRIC_HEADER);
    for metric in metrics {
        out.push_str(&csv_row(&[
            metric.name.clone(),
            metric.value.to_string(),
            metric.unit.clone(),
            metric.category.to_string(),
            metric.trend.as_str().to_string(),
            metric.warning_threshold.to_string(),
            metric.critical_threshold.to_string(),
            metric.timestamp.to_rfc3339(),
        ]));
    }
    out
}

fn alerts_csv(alerts: &[MonitoringAlert]) -> String {
    let mut out = format!("{}\n", ALERT_HEADER);
    for alert in alerts {
        out.push_str(&csv_row(&[
            alert.id.clone(),
            format!("{:?}", alert.alert_type).to_lowercase(),
            alert.severity.as_str().to_string(),
            alert.title.clone(),
            alert.source.clone(),
            alert.timestamp.to_rfc3339(),
            alert.resolved.to_string(),
            alert.resolved_by.clone().unwrap_or_default(),
        ]));
    }
    out
}

/// Thin wrapper over the quick-xml writer for tagged-field output
struct XmlBuilder {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlBuilder {
    fn new() -> Result<Self, ExportError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| ExportError::Xml(e.to_string()))?;
        Ok(Self { writer })
    }

    fn open(&mut self, tag: &str) -> Result<(), ExportError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(tag)))
            .map_err(|e| ExportError::Xml(e.to_string()))
    }

    fn open_with(&mut self, tag: &str, attr: (&str, &str)) -> Result<(), ExportError> {
        let mut start = BytesStart::new(tag);
        start.push_attribute(attr);
        self.writer
            .write_event(Event::Start(start))
            .map_err(|e| ExportError::Xml(e.to_string()))
    }

    fn close(&mut self, tag: &str) -> Result<(), ExportError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(tag)))
            .map_err(|e| ExportError::Xml(e.to_string()))
    }

    fn field(&mut self, tag: &str, value: &str) -> Result<(), ExportError> {
        self.open(tag)?;
        self.writer
            .write_event(Event::Text(BytesText::new(value)))
            .map_err(|e| ExportError::Xml(e.to_string()))?;
        self.close(tag)
    }

    fn list(&mut self, tag: &str, item: &str, values: &[String]) -> Result<(), ExportError> {
        self.open(tag)?;
        for value in values {
            self.field(item, value)?;
        }
        self.close(tag)
    }

    fn finish(self) -> Result<String, ExportError> {
        String::from_utf8(self.writer.into_inner().into_inner())
            .map_err(|e| ExportError::Xml(e.to_string()))
    }
}

fn write_metrics(xml: &mut XmlBuilder, metrics: &[ArchitectureMetric]) -> Result<(), ExportError> {
    xml.open("metrics")?;
    for metric in metrics {
        xml.open("metric")?;
        xml.field("name", &metric.name)?;
        xml.field("value", &metric.value.to_string())?;
        xml.field("unit", &metric.unit)?;
        xml.field("category", metric.category.as_str())?;
        xml.field("trend", metric.trend.as_str())?;
        xml.field("warningThreshold", &metric.warning_threshold.to_string())?;
        xml.field("criticalThreshold", &metric.critical_threshold.to_string())?;
        xml.field("timestamp", &metric.timestamp.to_rfc3339())?;
        xml.field("description", &metric.description)?;
        xml.list("recommendations", "recommendation", &metric.recommendations)?;
        xml.close("metric")?;
    }
    xml.close("metrics")
}

fn write_alert(xml: &mut XmlBuilder, alert: &MonitoringAlert) -> Result<(), ExportError> {
    xml.open("alert")?;
    xml.field("id", &alert.id)?;
    xml.field("type", &format!("{:?}", alert.alert_type).to_lowercase())?;
    xml.field("severity", alert.severity.as_str())?;
    xml.field("title", &alert.title)?;
    xml.field("description", &alert.description)?;
    xml.field("source", &alert.source)?;
    xml.field("timestamp", &alert.timestamp.to_rfc3339())?;
    xml.list("immediateActions", "action", &alert.immediate_actions)?;
    xml.list("shortTermActions", "action", &alert.short_term_actions)?;
    xml.list("longTermActions", "action", &alert.long_term_actions)?;
    xml.field("resolved", &alert.resolved.to_string())?;
    xml.close("alert")
}

fn write_event(xml: &mut XmlBuilder, event: &MonitoringEvent) -> Result<(), ExportError> {
    xml.open("event")?;
    xml.field("id", &event.id)?;
    xml.field("type", &format!("{:?}", event.event_type).to_lowercase())?;
    xml.field("severity", event.severity.as_str())?;
    xml.field("timestamp", &event.timestamp.to_rfc3339())?;
    xml.field("source", &event.source)?;
    xml.field("message", &event.message)?;
    xml.field("category", event.category.as_str())?;
    xml.close("event")
}

fn write_trend(xml: &mut XmlBuilder, category: &str, bucket: &TrendBucket) -> Result<(), ExportError> {
    let points: Vec<String> = bucket.points.iter().map(|p| format!("{:.2}", p)).collect();
    let forecast: Vec<String> = bucket
        .analysis
        .forecast
        .iter()
        .map(|p| format!("{:.2}", p))
        .collect();

    xml.open_with("trend", ("category", category))?;
    xml.field("direction", bucket.analysis.direction.as_str())?;
    xml.field("strength", &format!("{:.3}", bucket.analysis.strength))?;
    xml.field("confidence", &format!("{:.3}", bucket.analysis.confidence))?;
    xml.field("synthetic", &bucket.synthetic.to_string())?;
    xml.field("points", &points.join(","))?;
    xml.field("forecast", &forecast.join(","))?;
    xml.list("insights", "insight", &bucket.analysis.insights)?;
    xml.close("trend")
}

fn dashboard_xml(dashboard: &DashboardSnapshot) -> Result<String, ExportError> {
    let mut xml = XmlBuilder::new()?;
    xml.open("dashboard")?;
    xml.field("overallHealth", &dashboard.overall_health.to_string())?;
    xml.field("lastUpdated", &dashboard.last_updated.to_rfc3339())?;

    write_metrics(&mut xml, &dashboard.metrics)?;

    xml.open("alerts")?;
    for alert in &dashboard.alerts {
        write_alert(&mut xml, alert)?;
    }
    xml.close("alerts")?;

    xml.open("trends")?;
    for (category, bucket) in dashboard.trends.iter() {
        write_trend(&mut xml, category.as_str(), bucket)?;
    }
    xml.close("trends")?;

    xml.open("topIssues")?;
    for event in &dashboard.top_issues {
        write_event(&mut xml, event)?;
    }
    xml.close("topIssues")?;

    xml.list("recommendations", "recommendation", &dashboard.recommendations)?;
    xml.close("dashboard")?;
    xml.finish()
}
