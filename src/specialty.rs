//! Specialty definitions and the fixed per-specialty routing table.

use rand::Rng;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Service categories a patient can require and a consultant can provide.
///
/// The ordering is stable so tables can rely on integer indexes instead of branching on specific
/// labels. The set is closed: [`Specialty::ALL`], `index`, the labels and the built-in shift
/// rosters all list exactly these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialty {
    Paediatrics,
    Surgery,
    Cardiology,
}

impl Specialty {
    /// Every specialty in table order.
    pub const ALL: [Specialty; 3] = [
        Specialty::Paediatrics,
        Specialty::Surgery,
        Specialty::Cardiology,
    ];

    /// Stable index for specialty based arrays.
    pub const fn index(self) -> usize {
        match self {
            Specialty::Paediatrics => 0,
            Specialty::Surgery => 1,
            Specialty::Cardiology => 2,
        }
    }

    /// Human readable name used in summaries and log lines.
    pub const fn display_name(self) -> &'static str {
        match self {
            Specialty::Paediatrics => "Paediatrician",
            Specialty::Surgery => "Surgeon",
            Specialty::Cardiology => "Cardiologist",
        }
    }

    /// Draw a specialty uniformly at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Specialty {
        Specialty::ALL[rng.gen_range(0..Specialty::ALL.len())]
    }
}

impl fmt::Display for Specialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Specialty::Paediatrics => "paediatrics",
            Specialty::Surgery => "surgery",
            Specialty::Cardiology => "cardiology",
        };
        write!(f, "{label}")
    }
}

/// One value per [`Specialty`], built once and never resized.
///
/// This is the routing table behind every Specialty → queue lookup: entries can be replaced in
/// place but specialties can never be added or removed after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialtyTable<T> {
    values: Vec<T>,
}

impl<T> SpecialtyTable<T> {
    /// Build a table by executing a closure for each specialty in [`Specialty::ALL`] order.
    ///
    /// # Example
    /// ```
    /// use clinic_pipeline::{Specialty, SpecialtyTable};
    ///
    /// let names = SpecialtyTable::from_fn(|specialty| specialty.display_name());
    /// assert_eq!(names[Specialty::Surgery], "Surgeon");
    /// ```
    pub fn from_fn(mut f: impl FnMut(Specialty) -> T) -> Self {
        let mut values = Vec::with_capacity(Specialty::ALL.len());
        for specialty in Specialty::ALL {
            values.push(f(specialty));
        }
        SpecialtyTable { values }
    }

    /// Borrow the value for a given specialty.
    pub fn get(&self, specialty: Specialty) -> &T {
        &self.values[specialty.index()]
    }

    /// Mutably borrow the value for a given specialty.
    pub fn get_mut(&mut self, specialty: Specialty) -> &mut T {
        &mut self.values[specialty.index()]
    }

    /// Iterate `(specialty, value)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Specialty, &T)> {
        Specialty::ALL.into_iter().zip(self.values.iter())
    }

    /// Derive a new table from this one.
    pub fn map<U>(&self, mut f: impl FnMut(Specialty, &T) -> U) -> SpecialtyTable<U> {
        SpecialtyTable::from_fn(|specialty| f(specialty, self.get(specialty)))
    }
}

impl<T> Index<Specialty> for SpecialtyTable<T> {
    type Output = T;

    fn index(&self, index: Specialty) -> &Self::Output {
        self.get(index)
    }
}

impl<T> IndexMut<Specialty> for SpecialtyTable<T> {
    fn index_mut(&mut self, index: Specialty) -> &mut Self::Output {
        self.get_mut(index)
    }
}

// Tables travel through config files and JSON reports as `{ "surgery": ..., ... }` maps.
impl<T: Serialize> Serialize for SpecialtyTable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for SpecialtyTable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut entries = BTreeMap::<Specialty, T>::deserialize(deserializer)?;
        let mut values = Vec::with_capacity(Specialty::ALL.len());
        for specialty in Specialty::ALL {
            match entries.remove(&specialty) {
                Some(value) => values.push(value),
                None => {
                    return Err(D::Error::custom(format!(
                        "missing entry for specialty `{specialty}`"
                    )))
                }
            }
        }
        Ok(SpecialtyTable { values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn specialty_index_is_stable() {
        assert_eq!(Specialty::Paediatrics.index(), 0);
        assert_eq!(Specialty::Surgery.index(), 1);
        assert_eq!(Specialty::Cardiology.index(), 2);
    }

    #[test]
    fn specialty_table_builds_and_indexes() {
        let table = SpecialtyTable::from_fn(|s| s.index());
        assert_eq!(table[Specialty::Paediatrics], 0);
        assert_eq!(table[Specialty::Cardiology], 2);
        let doubled = table.map(|_, v| v * 2);
        assert_eq!(doubled[Specialty::Cardiology], 4);
    }

    #[test]
    fn random_draw_covers_every_specialty() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = SpecialtyTable::from_fn(|_| 0u32);
        for _ in 0..300 {
            seen[Specialty::random(&mut rng)] += 1;
        }
        for (specialty, count) in seen.iter() {
            assert!(*count > 50, "{specialty} drawn only {count} times");
        }
    }

    #[test]
    fn table_deserialize_requires_every_specialty() {
        let ok: SpecialtyTable<String> = serde_json::from_str(
            r#"{"paediatrics":"Dr. A","surgery":"Dr. B","cardiology":"Dr. C"}"#,
        )
        .unwrap();
        assert_eq!(ok[Specialty::Surgery], "Dr. B");

        let missing: Result<SpecialtyTable<String>, _> =
            serde_json::from_str(r#"{"paediatrics":"Dr. A","surgery":"Dr. B"}"#);
        assert!(missing.is_err());
    }
}
