//! Landing Templates - Saved Page Records
//!
//! The file shape a landing page is imported from and exported to: content
//! tree plus the assets uploaded for it. Where these records are stored is
//! up to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::assets::{AssetRecord, AssetSet};
use crate::bundle::archive_base_name;
use crate::tree::Node;

pub type TemplateId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandingTemplate {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub data: Node,
    #[serde(default)]
    pub assets: Vec<AssetRecord>,
}

impl LandingTemplate {
    /// A fresh record seeded with [`default_content`].
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_content(name, default_content())
    }

    pub fn with_content(name: impl Into<String>, data: Node) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            created: now,
            modified: now,
            data,
            assets: vec![],
        }
    }

    pub fn asset_set(&self) -> AssetSet {
        self.assets.iter().cloned().collect()
    }

    /// File name stem used for exports of this template.
    pub fn export_name(&self) -> String {
        archive_base_name(&self.name)
    }
}

impl Default for LandingTemplate {
    fn default() -> Self {
        Self::new("New Template")
    }
}

/// Starter content for a new landing page.
pub fn default_content() -> Node {
    Node::from(json!({
        "site": {
            "title": "My Landing Page",
            "favicon": "/assets/favicon.ico",
            "logoUrl": "/assets/logo.svg",
            "headerElements": "<!-- GA / Pixel Scripts -->"
        },
        "branding": {
            "primaryColor": "#3b82f6",
            "primaryColorHover": "#2563eb",
            "secondaryColor": "#f59e0b",
            "bgColor": "#f9fafb",
            "sectionBgAlt": "#f3f4f6",
            "textColor": "#1f2937",
            "footerBgColor": "#f59e0b",
            "footerTextColor": "#ffffff"
        },
        "hero": {
            "headline": "Your Amazing Product",
            "subheadline": "Transform your business with our innovative solution.",
            "ctaText": "Get Started",
            "ctaLink": "#apply",
            "note": "No credit card required.",
            "heroImage": "/assets/hero-image.png"
        },
        "featuresSection": {"title": "Features"},
        "features": [
            {
                "title": "Feature One",
                "description": "Amazing feature description.",
                "icon": "/assets/icons/feature1.svg"
            },
            {
                "title": "Feature Two",
                "description": "Another great feature.",
                "icon": "/assets/icons/feature2.svg"
            }
        ],
        "howItWorksSection": {"title": "How It Works"},
        "howItWorks": [
            "Step one description",
            "Step two description",
            "Step three description"
        ],
        "offer": {
            "headline": "Special Offer",
            "description": "Limited time offer for early adopters.",
            "ctaText": "Claim Offer",
            "ctaLink": "#apply"
        },
        "faq": [
            {"q": "What is this product?", "a": "This is an amazing product that solves your problems."},
            {"q": "How much does it cost?", "a": "Pricing starts at $99/month."}
        ],
        "socialLinks": {
            "twitter": "https://twitter.com/yourcompany",
            "linkedin": "https://linkedin.com/company/yourcompany",
            "facebook": "https://facebook.com/yourcompany",
            "whatsapp": "https://wa.me/1234567890",
            "pinterest": "https://pinterest.com/yourcompany",
            "instagram": "https://instagram.com/yourcompany",
            "tiktok": "https://tiktok.com/@yourcompany",
            "mastodon": "https://mastodon.social/@yourcompany",
            "bluesky": "https://bsky.app/profile/yourcompany.bsky.social"
        },
        "footer": {"copyright": "© 2025 Your Company. All rights reserved."}
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{collect_static_paths, AssetSet};

    #[test]
    fn test_new_template_is_seeded() {
        let template = LandingTemplate::new("Spring Promo");
        assert_eq!(template.created, template.modified);
        assert!(Uuid::parse_str(&template.id).is_ok());
        assert_eq!(template.data.lookup("hero.ctaText"), Some(&Node::from("Get Started")));
        assert_eq!(template.export_name(), "spring_promo");
    }

    #[test]
    fn test_template_from_loaded_content() {
        let content = Node::from(json!({"site": {"title": "Shipped defaults"}}));
        let template = LandingTemplate::with_content("Loaded", content.clone());
        assert_eq!(template.data, content);
        assert!(template.assets.is_empty());
    }

    #[test]
    fn test_default_content_asset_references() {
        let paths = collect_static_paths(&default_content(), &AssetSet::new());
        assert_eq!(paths.len(), 5);
        assert!(paths.contains(&"/assets/icons/feature2.svg".to_string()));
    }

    #[test]
    fn test_record_file_round_trip() {
        let mut template = LandingTemplate::new("Launch");
        template
            .assets
            .push(AssetRecord::new("logo.svg", "/assets/logo.svg", "image/svg+xml", b"<svg/>".to_vec()));

        let raw = serde_json::to_string(&template).unwrap();
        assert!(raw.contains("\"logoUrl\""));
        let back: LandingTemplate = serde_json::from_str(&raw).unwrap();

        assert_eq!(back.id, template.id);
        assert_eq!(back.data, template.data);
        assert_eq!(back.asset_set().len(), 1);
    }
}
