use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::settings::AppSettings;
use crate::store::{load_json, Loaded};
use crate::tasks::is_hex_color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Background,
    Cushion,
    AnimalTail,
    Clothes,
    EyeShape,
    MouthShape,
    HairStyle,
    FaceDeco1,
    FaceDeco2,
    FaceDeco3,
    FaceDeco4,
    AnimalEar,
    Accessory1,
    Accessory2,
    Accessory3,
    HairColor,
    EyeColor,
    ClothesColor,
    CushionColor,
}

impl ItemType {
    pub const ALL: [ItemType; 19] = [
        Self::Background,
        Self::Cushion,
        Self::AnimalTail,
        Self::Clothes,
        Self::EyeShape,
        Self::MouthShape,
        Self::HairStyle,
        Self::FaceDeco1,
        Self::FaceDeco2,
        Self::FaceDeco3,
        Self::FaceDeco4,
        Self::AnimalEar,
        Self::Accessory1,
        Self::Accessory2,
        Self::Accessory3,
        Self::HairColor,
        Self::EyeColor,
        Self::ClothesColor,
        Self::CushionColor,
    ];

    /// Color categories carry a custom color instead of an equipped item.
    pub fn is_color_category(self) -> bool {
        matches!(
            self,
            Self::HairColor | Self::EyeColor | Self::ClothesColor | Self::CushionColor
        )
    }

    /// Drawing order of the avatar, back to front.
    pub fn layer(self) -> u8 {
        match self {
            Self::Background => 0,
            Self::Cushion => 5,
            Self::AnimalTail => 8,
            Self::Clothes => 10,
            Self::EyeShape => 15,
            Self::MouthShape => 16,
            Self::HairStyle => 20,
            Self::FaceDeco1 => 30,
            Self::FaceDeco2 => 31,
            Self::FaceDeco3 => 32,
            Self::FaceDeco4 => 33,
            Self::AnimalEar => 40,
            Self::Accessory1 => 41,
            Self::Accessory2 => 42,
            Self::Accessory3 => 43,
            Self::HairColor | Self::EyeColor | Self::ClothesColor | Self::CushionColor => 99,
        }
    }

    /// The equippable category whose image a color category tints.
    pub fn tinted_category(self) -> Option<ItemType> {
        match self {
            Self::HairColor => Some(Self::HairStyle),
            Self::EyeColor => Some(Self::EyeShape),
            Self::ClothesColor => Some(Self::Clothes),
            Self::CushionColor => Some(Self::Cushion),
            _ => None,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let wanted = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| format!("{t:?}").to_lowercase() == wanted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub price: u64,
    #[serde(default)]
    pub image_path: String,
}

impl ShopItem {
    pub fn is_free(&self) -> bool {
        self.price == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemStatus {
    pub owned: bool,
    pub equipped: bool,
}

/// Static catalog loaded from the bundled item database.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: Vec<ShopItem>,
}

impl ItemCatalog {
    pub fn new(items: Vec<ShopItem>) -> Self {
        Self { items }
    }

    pub fn load(path: &Path) -> Result<Loaded<Self>> {
        let loaded: Loaded<Vec<ShopItem>> = load_json(path)?;
        Ok(Loaded {
            value: Self::new(loaded.value),
            source: loaded.source,
        })
    }

    pub fn items(&self) -> &[ShopItem] {
        &self.items
    }

    pub fn get(&self, id: Uuid) -> Result<&ShopItem> {
        self.items
            .iter()
            .find(|item| item.id == id)
            .ok_or(Error::ItemNotFound { id })
    }

    /// What the shop sells: priced items only.
    pub fn shop_inventory(&self) -> Vec<&ShopItem> {
        self.items.iter().filter(|item| !item.is_free()).collect()
    }

    pub fn of_type(&self, item_type: ItemType) -> Vec<&ShopItem> {
        self.items
            .iter()
            .filter(|item| item.item_type == item_type)
            .collect()
    }

    pub fn status(&self, settings: &AppSettings, item: &ShopItem) -> ItemStatus {
        let owned = item.is_free() || settings.owned_item_ids.contains(&item.id);
        let equipped = !item.item_type.is_color_category()
            && settings.equipped_items.get(&item.item_type) == Some(&item.id);
        ItemStatus { owned, equipped }
    }

    /// Deducts the price and records ownership.
    pub fn purchase(&self, settings: &mut AppSettings, id: Uuid) -> Result<u64> {
        let item = self.get(id)?;
        if settings.owned_item_ids.contains(&id) {
            return Err(Error::AlreadyOwned {
                name: item.name.clone(),
            });
        }
        if settings.coins < item.price {
            return Err(Error::InsufficientCoins {
                price: item.price,
                coins: settings.coins,
            });
        }
        settings.coins -= item.price;
        settings.owned_item_ids.insert(id);
        Ok(settings.coins)
    }

    /// Equips the item, or unequips it when it already is. Returns the new equipped state.
    pub fn toggle_equip(&self, settings: &mut AppSettings, id: Uuid) -> Result<bool> {
        let item = self.get(id)?;
        if item.item_type.is_color_category() {
            return Err(Error::ColorCategory {
                item_type: item.item_type,
            });
        }
        if !self.status(settings, item).owned {
            return Err(Error::NotOwned {
                name: item.name.clone(),
            });
        }
        if settings.equipped_items.get(&item.item_type) == Some(&id) {
            settings.equipped_items.remove(&item.item_type);
            return Ok(false);
        }
        settings.equipped_items.insert(item.item_type, id);
        Ok(true)
    }

    pub fn set_custom_color(
        &self,
        settings: &mut AppSettings,
        item_type: ItemType,
        color: &str,
    ) -> Result<()> {
        if !item_type.is_color_category() {
            return Err(Error::NotColorCategory { item_type });
        }
        let color = color.trim();
        if !is_hex_color(color) {
            return Err(Error::InvalidColor {
                value: color.to_owned(),
            });
        }
        settings.custom_colors.insert(item_type, color.to_uppercase());
        Ok(())
    }

    /// Equipped items in drawing order, with the tint from the matching color category.
    pub fn avatar_layers<'a>(&'a self, settings: &AppSettings) -> Vec<AvatarLayer<'a>> {
        let mut layers: Vec<AvatarLayer<'a>> = settings
            .equipped_items
            .values()
            .filter_map(|id| self.items.iter().find(|item| item.id == *id))
            .filter(|item| self.status(settings, item).owned)
            .map(|item| AvatarLayer {
                item,
                tint: ItemType::ALL
                    .into_iter()
                    .find(|color| color.tinted_category() == Some(item.item_type))
                    .and_then(|color| settings.custom_colors.get(&color).cloned()),
            })
            .collect();
        layers.sort_by_key(|layer| layer.item.item_type.layer());
        layers
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarLayer<'a> {
    pub item: &'a ShopItem,
    pub tint: Option<String>,
}
