//! GDAL metadata block (TIFF tag 42112).
//!
//! GDAL stores dataset metadata items and per-band unit types as a small XML
//! document:
//!
//! ```text
//! <GDALMetadata>
//!   <Item name="PRODUCT">RDPA</Item>
//!   <Item name="units" sample="0" role="unittype">mm</Item>
//! </GDALMetadata>
//! ```
//!
//! Only the flat `Item` form is produced or understood.

use std::collections::BTreeMap;

/// Dataset-level metadata items plus the band unit type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GdalMetadata {
    pub items: BTreeMap<String, String>,
    pub units: Option<String>,
}

impl GdalMetadata {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.units.is_none()
    }

    /// Render the XML block, repeating the unit type for each of `band_count`
    /// bands.
    pub fn to_xml(&self, band_count: usize) -> String {
        let mut xml = String::from("<GDALMetadata>\n");
        for (name, value) in &self.items {
            xml.push_str(&format!(
                "  <Item name=\"{}\">{}</Item>\n",
                escape(name),
                escape(value)
            ));
        }
        if let Some(units) = &self.units {
            for sample in 0..band_count {
                xml.push_str(&format!(
                    "  <Item name=\"units\" sample=\"{}\" role=\"unittype\">{}</Item>\n",
                    sample,
                    escape(units)
                ));
            }
        }
        xml.push_str("</GDALMetadata>");
        xml
    }

    /// Parse the XML block. Unrecognised content is skipped.
    pub fn from_xml(xml: &str) -> Self {
        let mut metadata = Self::default();
        let mut rest = xml;

        while let Some(start) = rest.find("<Item") {
            rest = &rest[start + "<Item".len()..];
            let Some(tag_end) = rest.find('>') else { break };
            let attrs = &rest[..tag_end];
            rest = &rest[tag_end + 1..];
            let Some(close) = rest.find("</Item>") else { break };
            let text = unescape(&rest[..close]);
            rest = &rest[close + "</Item>".len()..];

            let Some(name) = attribute(attrs, "name") else { continue };
            match attribute(attrs, "role").as_deref() {
                Some("unittype") => {
                    // first band wins; the bands of one file share units
                    if metadata.units.is_none() {
                        metadata.units = Some(text);
                    }
                }
                Some(_) => {}
                None => {
                    metadata.items.insert(name, text);
                }
            }
        }

        metadata
    }
}

fn attribute(attrs: &str, name: &str) -> Option<String> {
    let key = format!("{}=\"", name);
    let start = attrs.find(&key)? + key.len();
    let end = attrs[start..].find('"')? + start;
    Some(unescape(&attrs[start..end]))
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn unescape(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
