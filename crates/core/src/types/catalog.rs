//! Fixed catalog attributes for product listings.

string_enum! {
    /// Built-in storage capacity.
    pub enum Storage {
        Gb64 => "64GB",
        Gb128 => "128GB",
        Gb256 => "256GB",
        Gb512 => "512GB",
        Tb1 => "1TB",
    }
}

string_enum! {
    /// Memory size.
    pub enum Ram {
        Gb4 => "4GB",
        Gb6 => "6GB",
        Gb8 => "8GB",
        Gb12 => "12GB",
        Gb16 => "16GB",
    }
}

string_enum! {
    /// Physical condition of the listed unit.
    pub enum Condition {
        New => "new",
        LikeNew => "like_new",
        Excellent => "excellent",
        Good => "good",
        Fair => "fair",
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::New
    }
}

string_enum! {
    /// Feature tags a listing can carry.
    pub enum Feature {
        FiveG => "5g",
        DualSim => "dual_sim",
        WirelessCharging => "wireless_charging",
        FastCharging => "fast_charging",
        WaterResistant => "water_resistant",
        FaceUnlock => "face_unlock",
        Fingerprint => "fingerprint",
        ExpandableStorage => "expandable_storage",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_strings() {
        assert_eq!(Storage::Tb1.as_str(), "1TB");
        assert_eq!("128GB".parse::<Storage>(), Ok(Storage::Gb128));
        assert!("128gb".parse::<Storage>().is_err());
    }

    #[test]
    fn test_all_lists_every_variant() {
        assert_eq!(Feature::ALL.len(), 8);
        assert_eq!(Condition::ALL.first(), Some(&Condition::New));
    }
}
