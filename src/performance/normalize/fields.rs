//! Field-resolution tables for the independently-evolved evaluation stores.
//!
//! Every attribute the engine reads is enumerated here with the ordered
//! list of field names to try: the current schema name first, then the
//! known legacy variants still present in older rows. Nothing outside
//! these tables is ever probed.

/// Ordered candidate names for one canonical attribute.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldNames {
    pub(crate) canonical: &'static str,
    pub(crate) aliases: &'static [&'static str],
}

impl FieldNames {
    pub(crate) fn candidates(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.canonical).chain(self.aliases.iter().copied())
    }
}

const fn names(canonical: &'static str, aliases: &'static [&'static str]) -> FieldNames {
    FieldNames { canonical, aliases }
}

pub(crate) mod checklist {
    use super::{names, FieldNames};

    pub(crate) const USER: FieldNames = names("userId", &["personelId"]);
    pub(crate) const COMPLETED_AT: FieldNames = names("completedAt", &["tamamlanmaTarihi"]);
    pub(crate) const TEMPLATE_KIND: FieldNames = names("templateKind", &["kontrolTipi"]);
    pub(crate) const QUESTIONS: FieldNames = names("questions", &["sorular"]);
    pub(crate) const QUESTION_SCORE: FieldNames = names("score", &["puan"]);
    pub(crate) const QUESTION_MAX: FieldNames = names("maxScore", &["maksimumPuan"]);
}

pub(crate) mod mold_change {
    use super::{names, FieldNames};

    pub(crate) const PRIMARY: FieldNames = names("operatorId", &["operatorSicil"]);
    pub(crate) const BUDDY: FieldNames = names("buddyId", &["yardimciOperator"]);
    pub(crate) const COMPLETED_AT: FieldNames = names("completedAt", &["bitisTarihi"]);
    pub(crate) const POINTS: FieldNames = names("points", &["gorevPuani"]);
    pub(crate) const MAX_POINTS: FieldNames = names("maxPoints", &["maksimumPuan"]);
    pub(crate) const PRIMARY_SHARE: FieldNames = names("primaryShare", &["operatorPayi"]);
}

pub(crate) mod hr_template {
    use super::{names, FieldNames};

    pub(crate) const USER: FieldNames = names("userId", &["personelId"]);
    pub(crate) const EVALUATED_AT: FieldNames = names("evaluatedAt", &["degerlendirmeTarihi"]);
    pub(crate) const ITEMS: FieldNames = names("items", &["maddeler"]);
    pub(crate) const ITEM_SCORE: FieldNames = names("score", &["puan"]);
    pub(crate) const ITEM_MAX: FieldNames = names("maxScore", &["maksimumPuan"]);
}

pub(crate) mod payroll {
    use super::{names, FieldNames};

    pub(crate) const USER: FieldNames = names("userId", &["personelId"]);
    pub(crate) const DATE: FieldNames = names("date", &["tarih"]);
    pub(crate) const KIND: FieldNames = names("adjustmentKind", &["tur"]);
    pub(crate) const HOURS: FieldNames = names("hours", &["saat"]);
    pub(crate) const DAYS: FieldNames = names("days", &["gun"]);
    pub(crate) const POINTS: FieldNames = names("points", &["puan"]);
    pub(crate) const MAX_POINTS: FieldNames = names("maxPoints", &["maksimumPuan"]);
}

pub(crate) mod row {
    use super::{names, FieldNames};

    pub(crate) const ID: FieldNames = names("id", &["sourceId", "kayitNo"]);
}
