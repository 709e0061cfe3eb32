use crate::{
    io::Write,
    name::NameComponent,
    tlv::{DecodingError, TlvEncode, TlvReader, TypedEmpty},
};

pub const TLV_TYPE_EXCLUDE: u32 = 16;
pub const TLV_TYPE_ANY: u32 = 19;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExcludeEntry {
    Any,
    Component(NameComponent),
}

/// A list of excluded components and `Any` ranges between them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Exclude {
    entries: Vec<ExcludeEntry>,
}

impl Exclude {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ExcludeEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn append_any(&mut self) -> &mut Self {
        self.entries.push(ExcludeEntry::Any);
        self
    }

    pub fn append_component(&mut self, component: NameComponent) -> &mut Self {
        self.entries.push(ExcludeEntry::Component(component));
        self
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn matches(&self, component: &NameComponent) -> bool {
        let mut i = 0;
        while i < self.entries.len() {
            match &self.entries[i] {
                ExcludeEntry::Component(excluded) => {
                    if excluded == component {
                        return true;
                    }
                    i += 1;
                }
                ExcludeEntry::Any => {
                    let lower = match i.checked_sub(1).map(|j| &self.entries[j]) {
                        Some(ExcludeEntry::Component(c)) => Some(c),
                        _ => None,
                    };

                    // Consecutive Any entries form a single range
                    let mut upper_index = i + 1;
                    while let Some(ExcludeEntry::Any) = self.entries.get(upper_index) {
                        upper_index += 1;
                    }
                    let upper = match self.entries.get(upper_index) {
                        Some(ExcludeEntry::Component(c)) => Some(c),
                        _ => None,
                    };

                    let above_lower = lower.map_or(true, |lower| component > lower);
                    let below_upper = upper.map_or(true, |upper| component < upper);
                    if above_lower && below_upper {
                        return true;
                    }
                    i = upper_index;
                }
            }
        }
        false
    }

    pub(crate) fn from_tlv_value(val: &[u8]) -> Result<Self, DecodingError> {
        let mut exclude = Exclude::new();
        for tlv in TlvReader::new(val) {
            let tlv = tlv?;
            if tlv.typ.get() == TLV_TYPE_ANY {
                exclude.append_any();
            } else {
                exclude.append_component(NameComponent::from_tlv(&tlv)?);
            }
        }
        Ok(exclude)
    }
}

impl TlvEncode for Exclude {
    const TLV_TYPE: u32 = TLV_TYPE_EXCLUDE;

    fn inner_length(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match entry {
                ExcludeEntry::Any => TypedEmpty::<TLV_TYPE_ANY>.encoded_length(),
                ExcludeEntry::Component(c) => c.encoded_length(),
            })
            .sum()
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        for entry in &self.entries {
            match entry {
                ExcludeEntry::Any => TypedEmpty::<TLV_TYPE_ANY>.encode(writer)?,
                ExcludeEntry::Component(c) => c.encode(writer)?,
            }
        }
        Ok(())
    }
}
