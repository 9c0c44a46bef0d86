/// Render a `Document` display list into PDF bytes.
///
/// Text uses the standard Type1 Helvetica faces with WinAnsi encoding, so no font data is
/// embedded. Each distinct image is written once as an XObject (with a soft mask when it
/// carries transparency) and shared by every page that draws it. No creation date or
/// producer metadata is written, which keeps output reproducible.
use std::collections::HashMap;
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream};

use crate::canvas::{Color, Document, DrawOp, Font, RasterImage};
use crate::error::CommonError;

pub const PDF_MIME_TYPE: &str = "application/pdf";

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";

pub fn render_pdf(document: &Document) -> Result<Vec<u8>, CommonError> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(type1_font("Helvetica"));
    let bold_id = doc.add_object(type1_font("Helvetica-Bold"));

    // Keyed by the Arc address so a shared image is embedded once.
    let mut images: HashMap<*const RasterImage, (String, ObjectId)> = HashMap::new();
    let mut kids: Vec<Object> = Vec::with_capacity(document.pages.len());

    for page in &document.pages {
        let mut operations = Vec::new();
        let mut page_images = Dictionary::new();

        for op in &page.ops {
            match op {
                DrawOp::Text {
                    x,
                    y,
                    font,
                    size,
                    color,
                    text,
                    vertical,
                } => {
                    let font_name = match font {
                        Font::Helvetica => REGULAR_FONT,
                        Font::HelveticaBold => BOLD_FONT,
                    };
                    let matrix = if *vertical {
                        [0.0, 1.0, -1.0, 0.0, *x, *y]
                    } else {
                        [1.0, 0.0, 0.0, 1.0, *x, *y]
                    };
                    operations.push(fill_color(*color));
                    operations.push(Operation::new("BT", vec![]));
                    operations.push(Operation::new(
                        "Tf",
                        vec![Object::Name(font_name.as_bytes().to_vec()), real(*size)],
                    ));
                    operations.push(Operation::new("Tm", matrix.iter().map(|v| real(*v)).collect()));
                    operations.push(Operation::new(
                        "Tj",
                        vec![Object::string_literal(encode_win_ansi(text))],
                    ));
                    operations.push(Operation::new("ET", vec![]));
                }
                DrawOp::Image {
                    image,
                    x,
                    y,
                    width,
                    height,
                } => {
                    let key = Arc::as_ptr(image);
                    let next_index = images.len() + 1;
                    let (name, id) = match images.get(&key) {
                        Some(entry) => entry.clone(),
                        None => {
                            let id = add_image(&mut doc, image);
                            let entry = (format!("Im{next_index}"), id);
                            images.insert(key, entry.clone());
                            entry
                        }
                    };
                    page_images.set(name.as_bytes().to_vec(), Object::Reference(id));
                    operations.push(Operation::new("q", vec![]));
                    operations.push(Operation::new(
                        "cm",
                        vec![real(*width), real(0.0), real(0.0), real(*height), real(*x), real(*y)],
                    ));
                    operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                    operations.push(Operation::new("Q", vec![]));
                }
                DrawOp::Rect {
                    x,
                    y,
                    width,
                    height,
                    fill,
                } => {
                    operations.push(fill_color(*fill));
                    operations.push(Operation::new(
                        "re",
                        vec![real(*x), real(*y), real(*width), real(*height)],
                    ));
                    operations.push(Operation::new("f", vec![]));
                }
            }
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let resources = dictionary! {
            "Font" => dictionary! {
                REGULAR_FONT => regular_id,
                BOLD_FONT => bold_id,
            },
            "XObject" => page_images,
        };
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "MediaBox" => vec![real(0.0), real(0.0), real(document.width), real(document.height)],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

fn type1_font(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn add_image(doc: &mut lopdf::Document, image: &RasterImage) -> ObjectId {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(image.width),
        "Height" => i64::from(image.height),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8_i64,
    };
    if let Some(alpha) = &image.alpha {
        let mask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(image.width),
                "Height" => i64::from(image.height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8_i64,
            },
            alpha.clone(),
        );
        let mask_id = doc.add_object(mask);
        dict.set("SMask", Object::Reference(mask_id));
    }
    doc.add_object(Stream::new(dict, image.rgb.clone()))
}

fn fill_color(color: Color) -> Operation {
    Operation::new("rg", vec![real(color.r), real(color.g), real(color.b)])
}

fn real(value: f32) -> Object {
    Object::Real(value)
}

/// Map text to WinAnsi bytes. Characters outside the encoding become '?'.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}
