/// Document composer: lays out the strategy report and the assessment report as
/// display lists on landscape A4 pages.
use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::assessment::Responses;
use crate::canvas::{Assets, Color, Document, Font, Page};
use crate::chart::{self, Anchor, ChartImage, ChartSpec, CHART_NOMINAL_PT};
use crate::contact::ContactInfo;
use crate::error::CommonError;
use crate::question_bank::{QuestionBank, Topic};
use crate::strategy::StrategySummary;
use crate::text::{flow_segments, text_width, wrap_words, Segment};

pub const MARGIN: f32 = 30.0;
pub const STRATEGY_TITLE: &str = "Tailored AI Strategy Report";
pub const CHART_Y_RANGE: (u8, u8) = (0, 5);

const BANNER_RATIO: f32 = 0.4;
const LOGO_WIDTH: f32 = 157.5;
const LOGO_HEIGHT: f32 = 60.0;

const STATEMENT_SIZE: f32 = 14.0;
const STATEMENT_LINE_HEIGHT: f32 = 20.0;
const BODY_SIZE: f32 = 12.0;
const BODY_LINE_HEIGHT: f32 = 20.0;
const BLOCK_GAP: f32 = 40.0;

const PLOT_MARGIN_TOP: f32 = 100.0;
const PLOT_HEIGHT_RATIO: f32 = 0.5;
const PLOT_WIDTH_RATIO: f32 = 0.45;
const LEGEND_SIZE: f32 = 10.0;
const LEGEND_LINE_HEIGHT: f32 = 15.0;
const LEGEND_MIN_Y: f32 = 50.0;
const PLACEHOLDER_LABEL: &str = "Placeholder for Historical Data";

/// The strategy sentence as alternating fixed and selected segments.
pub fn statement_segments(summary: &StrategySummary) -> Vec<Segment> {
    vec![
        Segment::plain("Our R&D Transformation goal is to "),
        Segment::emphasized(summary.goal.as_str()),
        Segment::plain(", which will be accomplished by "),
        Segment::emphasized(summary.method.as_str()),
        Segment::plain(", through the strategic initiatives in "),
        Segment::emphasized(summary.tool.as_str()),
        Segment::plain(", and success will be evaluated by "),
        Segment::emphasized(summary.kpi.as_str()),
        Segment::plain("."),
    ]
}

pub fn statement_text(summary: &StrategySummary) -> String {
    statement_segments(summary)
        .into_iter()
        .map(|s| s.text)
        .collect()
}

pub fn compose_strategy_report(summary: &StrategySummary, assets: &Assets) -> Document {
    let mut doc = Document::landscape_a4();
    let (width, height) = (doc.width, doc.height);
    let page = doc.new_page();

    let banner_height = height * BANNER_RATIO;
    draw_banner(page, assets, width, height);
    if let Some(logo) = &assets.logo {
        page.image(
            logo,
            width - LOGO_WIDTH - MARGIN,
            height - banner_height - LOGO_HEIGHT - 10.0,
            LOGO_WIDTH,
            LOGO_HEIGHT,
        );
    }
    page.text(
        MARGIN,
        height - banner_height - LOGO_HEIGHT - 40.0,
        Font::HelveticaBold,
        16.0,
        Color::BLACK,
        STRATEGY_TITLE,
    );

    let top = height - banner_height - LOGO_HEIGHT - 38.0 - 80.0;
    let right = width - 2.0 * MARGIN;
    let runs = flow_segments(
        &statement_segments(summary),
        Font::HelveticaBold,
        STATEMENT_SIZE,
        MARGIN,
        right,
    );
    let mut y = top;
    for run in &runs {
        y = top - run.line as f32 * STATEMENT_LINE_HEIGHT;
        let color = if run.emphasis { Color::ACCENT } else { Color::BLACK };
        page.text(run.x, y, Font::HelveticaBold, STATEMENT_SIZE, color, run.text.as_str());
    }

    for (label, items) in [
        ("Recommended Use Cases:", &summary.use_cases),
        ("Suitable Partners:", &summary.partners),
    ] {
        y -= BLOCK_GAP;
        page.text(MARGIN, y, Font::Helvetica, BODY_SIZE, Color::BLACK, label);
        for line in wrap_words(&items.join(", "), Font::Helvetica, BODY_SIZE, right - MARGIN) {
            y -= BODY_LINE_HEIGHT;
            page.text(MARGIN, y, Font::Helvetica, BODY_SIZE, Color::BLACK, line);
        }
    }

    doc
}

/// Chart input for one topic: `Q{i}` labels by position, unanswered questions at 0.
pub fn topic_chart_spec(topic: &Topic, responses: &Responses) -> ChartSpec {
    ChartSpec {
        title: format!("User Session Data - {}", topic.name),
        bars: topic
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| (format!("Q{}", i + 1), responses.level_or_zero(&q.id)))
            .collect(),
        y_range: CHART_Y_RANGE,
    }
}

/// Cover page plus one page per completed topic found in the bank.
///
/// Completed names with no matching topic are skipped; pages follow bank order.
pub fn compose_assessment_report(
    bank: &QuestionBank,
    title: &str,
    contact: &ContactInfo,
    responses: &Responses,
    completed: &BTreeSet<String>,
    assets: &Assets,
) -> Result<Document, CommonError> {
    let mut doc = Document::landscape_a4();
    let (width, height) = (doc.width, doc.height);

    let cover = doc.new_page();
    draw_banner(cover, assets, width, height);
    let logo_y = height - height * BANNER_RATIO - LOGO_HEIGHT - 30.0;
    if let Some(logo) = &assets.logo {
        cover.image(logo, width - LOGO_WIDTH - MARGIN, logo_y, LOGO_WIDTH, LOGO_HEIGHT);
    }
    cover.text(MARGIN, logo_y - 40.0, Font::HelveticaBold, 24.0, Color::BLACK, title);
    let mut y = logo_y - 80.0;
    for (key, value) in contact.fields() {
        cover.text(MARGIN, y, Font::Helvetica, BODY_SIZE, Color::BLACK, format!("{key}: {value}"));
        y -= BODY_LINE_HEIGHT;
    }

    for name in completed {
        if bank.topic(name).is_none() {
            warn!(topic = %name, "completed topic not in question bank, page skipped");
        }
    }

    for topic in bank.topics().iter().filter(|t| completed.contains(&t.name)) {
        let chart = chart::render_chart(&topic_chart_spec(topic, responses))?;
        let page = doc.new_page();
        draw_topic_page(page, topic, &chart, assets, width, height)?;
        debug!(topic = %topic.name, "topic page composed");
    }

    Ok(doc)
}

fn draw_topic_page(
    page: &mut Page,
    topic: &Topic,
    chart: &ChartImage,
    assets: &Assets,
    width: f32,
    height: f32,
) -> Result<(), CommonError> {
    if let Some(logo) = &assets.logo {
        page.image(
            logo,
            width - LOGO_WIDTH - MARGIN,
            height - LOGO_HEIGHT - 20.0,
            LOGO_WIDTH,
            LOGO_HEIGHT,
        );
    }
    page.text(
        MARGIN,
        height - 60.0,
        Font::HelveticaBold,
        20.0,
        Color::BLACK,
        format!("Topic: {}", topic.name),
    );

    let box_width = width * PLOT_WIDTH_RATIO;
    let box_height = height * PLOT_HEIGHT_RATIO;
    let box_y = height - PLOT_MARGIN_TOP - box_height;

    let raster = Arc::new(chart::embed_chart(chart)?);
    let scale = (box_width / raster.width as f32).min(box_height / raster.height as f32);
    let (draw_w, draw_h) = (raster.width as f32 * scale, raster.height as f32 * scale);
    let draw_x = MARGIN + (box_width - draw_w) / 2.0;
    let draw_y = box_y + (box_height - draw_h) / 2.0;
    page.image(&raster, draw_x, draw_y, draw_w, draw_h);

    for label in &chart.labels {
        let size = label.size * draw_h / CHART_NOMINAL_PT;
        let advance = text_width(&label.text, Font::Helvetica, size);
        let shift = match label.anchor {
            Anchor::Start => 0.0,
            Anchor::Middle => advance / 2.0,
            Anchor::End => advance,
        };
        let x = draw_x + label.x * draw_w;
        let y = draw_y + label.y * draw_h;
        if label.vertical {
            page.vertical_text(x, y - shift, Font::Helvetica, size, Color::BLACK, label.text.as_str());
        } else {
            page.text(x - shift, y, Font::Helvetica, size, Color::BLACK, label.text.as_str());
        }
    }

    let placeholder_x = width / 2.0 + MARGIN;
    page.rect(placeholder_x, box_y, box_width, box_height, Color::LIGHT_GREY);
    page.text(
        placeholder_x + 10.0,
        box_y + box_height - 20.0,
        Font::Helvetica,
        BODY_SIZE,
        Color::BLACK,
        PLACEHOLDER_LABEL,
    );

    let mut y = box_y - 40.0;
    for (i, question) in topic.questions.iter().enumerate() {
        if y < LEGEND_MIN_Y {
            break;
        }
        page.text(
            MARGIN,
            y,
            Font::Helvetica,
            LEGEND_SIZE,
            Color::BLACK,
            format!("Q{} - {}", i + 1, question.text),
        );
        y -= LEGEND_LINE_HEIGHT;
    }
    Ok(())
}

fn draw_banner(page: &mut Page, assets: &Assets, width: f32, height: f32) {
    if let Some(banner) = &assets.banner {
        let banner_height = height * BANNER_RATIO;
        page.image(banner, 0.0, height - banner_height, width, banner_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawOp, RasterImage};
    use crate::catalog::{Catalog, SAMPLE_CATALOG};
    use crate::question_bank::SAMPLE_BANK;
    use crate::strategy::StrategySelection;

    fn summary() -> StrategySummary {
        let catalog = Catalog::from_json(SAMPLE_CATALOG).unwrap();
        let mut sel = StrategySelection::new();
        sel.choose_goal(&catalog, "Increase Efficiency");
        sel.choose_method(&catalog, "Automate Processes").unwrap();
        sel.choose_tool(&catalog, "RPA").unwrap();
        sel.choose_kpi("Cycle Time").unwrap();
        sel.summary().unwrap()
    }

    fn contact() -> ContactInfo {
        ContactInfo {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            company: "Analytical Engines".to_string(),
            phone: "555-0100".to_string(),
        }
    }

    fn text_ops(page: &Page) -> Vec<(f32, f32, Color, &str)> {
        page.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { x, y, color, text, .. } => Some((*x, *y, *color, text.as_str())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn statement_matches_selection() {
        assert_eq!(
            statement_text(&summary()),
            "Our R&D Transformation goal is to Increase Efficiency, which will be accomplished by \
             Automate Processes, through the strategic initiatives in RPA, and success will be \
             evaluated by Cycle Time."
        );
    }

    #[test]
    fn selected_values_use_accent_color() {
        let doc = compose_strategy_report(&summary(), &Assets::default());
        assert_eq!(doc.pages.len(), 1);
        let texts = text_ops(&doc.pages[0]);
        let accented: Vec<&str> = texts
            .iter()
            .filter(|(_, _, color, _)| *color == Color::ACCENT)
            .map(|(_, _, _, text)| *text)
            .collect();
        assert_eq!(
            accented,
            vec!["Increase Efficiency", "Automate Processes", "RPA", "Cycle Time"]
        );
        let page_texts: Vec<&str> = doc.pages[0].texts().collect();
        assert!(page_texts.contains(&STRATEGY_TITLE));
        assert!(page_texts.contains(&"Recommended Use Cases:"));
        assert!(page_texts.contains(&"Invoice Processing"));
        assert!(page_texts.contains(&"Suitable Partners:"));
        assert!(page_texts.contains(&"VendorX"));
    }

    #[test]
    fn statement_stays_within_right_margin() {
        let mut long = summary();
        long.goal = "Increase Efficiency Across Every Global Engineering Site".to_string();
        long.method = "Automating Repetitive Processes With Shared Platforms".to_string();
        let doc = compose_strategy_report(&long, &Assets::default());
        let limit = doc.width - MARGIN;
        let mut wrapped = false;
        for op in &doc.pages[0].ops {
            if let DrawOp::Text { x, font: Font::HelveticaBold, size, text, .. } = op {
                if *size == STATEMENT_SIZE {
                    assert!(x + text_width(text, Font::HelveticaBold, *size) <= limit, "{text}");
                    wrapped |= *x == MARGIN && !text.starts_with("Our");
                }
            }
        }
        assert!(wrapped, "long statement should wrap back to the margin");
    }

    #[test]
    fn assets_are_placed_when_present() {
        let image = Arc::new(RasterImage {
            width: 1,
            height: 1,
            rgb: vec![0, 0, 0],
            alpha: None,
        });
        let assets = Assets {
            banner: Some(Arc::clone(&image)),
            logo: Some(image),
        };
        let doc = compose_strategy_report(&summary(), &assets);
        let images = doc.pages[0]
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Image { .. }))
            .count();
        assert_eq!(images, 2);
    }

    #[test]
    fn one_page_per_completed_topic_plus_cover() {
        let bank = QuestionBank::from_json(SAMPLE_BANK).unwrap();
        let mut responses = Responses::default();
        responses.set("Q_a", 4);
        let completed: BTreeSet<String> = ["Process Maturity", "KPI Management", "Typo Topic"]
            .into_iter()
            .map(String::from)
            .collect();
        let doc = compose_assessment_report(
            &bank,
            "ERP Maturity Assessment Report",
            &contact(),
            &responses,
            &completed,
            &Assets::default(),
        )
        .unwrap();
        assert_eq!(doc.pages.len(), 3);

        let cover: Vec<&str> = doc.pages[0].texts().collect();
        assert!(cover.contains(&"ERP Maturity Assessment Report"));
        assert!(cover.contains(&"Email: ada@example.com"));

        let topic_page: Vec<&str> = doc.pages[1].texts().collect();
        assert!(topic_page.contains(&"Topic: Process Maturity"));
        assert!(topic_page.contains(&"Q1 - Processes are documented."));
        assert!(topic_page.contains(&PLACEHOLDER_LABEL));
    }

    #[test]
    fn unanswered_questions_chart_as_zero() {
        let bank = QuestionBank::from_json(SAMPLE_BANK).unwrap();
        let mut responses = Responses::default();
        responses.set("Q_a", 4);
        let spec = topic_chart_spec(bank.topic("Process Maturity").unwrap(), &responses);
        assert_eq!(
            spec.bars,
            vec![("Q1".to_string(), 4), ("Q2".to_string(), 0)]
        );
        assert_eq!(spec.y_range, (0, 5));
    }

    #[test]
    fn legend_stops_at_bottom_margin() {
        let questions: Vec<String> = (1..=12)
            .map(|i| format!(r#"{{"id": "L{i}", "question": "Question {i}"}}"#))
            .collect();
        let json = format!(
            r#"{{"topics": [{{"name": "Long", "questions": [{}]}}],
                "scale": {{"1": "a", "2": "b", "3": "c", "4": "d", "5": "e"}}}}"#,
            questions.join(",")
        );
        let bank = QuestionBank::from_json(&json).unwrap();
        let completed = BTreeSet::from(["Long".to_string()]);
        let doc = compose_assessment_report(
            &bank,
            "Report",
            &contact(),
            &Responses::default(),
            &completed,
            &Assets::default(),
        )
        .unwrap();
        let legend: Vec<(f32, f32, Color, &str)> = text_ops(&doc.pages[1])
            .into_iter()
            .filter(|(_, _, _, text)| text.contains(" - Question "))
            .collect();
        assert!(legend.len() < 12);
        assert!(!legend.is_empty());
        assert!(legend.iter().all(|(_, y, _, _)| *y >= LEGEND_MIN_Y));
    }
}
