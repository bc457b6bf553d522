//! Canonical column catalogue for the `newsletter_submissions` table.
//!
//! Every optional column is declared exactly once in [`FIELDS`], in the order
//! used by the form, the export header and the insert statement. Columns are
//! grouped into themes (one optional sub-record each) and themes into the six
//! form sections.

use std::fmt;

use FieldKind::{Date, Decimal, Integer, LongText, Photos, Text};

/// Storage and input type of a catalogue column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    LongText,
    Date,
    Integer,
    Decimal,
    Photos,
}

/// Form tab a theme belongs to. The key doubles as the persisted `section` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Mou,
    Industry,
    Workshops,
    Seminars,
    Research,
    Summary,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Mou,
        Section::Industry,
        Section::Workshops,
        Section::Seminars,
        Section::Research,
        Section::Summary,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Section::Mou => "mou",
            Section::Industry => "industry",
            Section::Workshops => "workshops",
            Section::Seminars => "seminars",
            Section::Research => "research",
            Section::Summary => "summary",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Section::Mou => "MoU / Awards / Recognitions",
            Section::Industry => "Industry - Institute Interaction",
            Section::Workshops => "Workshops / FDPs / Fests",
            Section::Seminars => "Seminars / Expert Talks",
            Section::Research => "Research Work",
            Section::Summary => "Summary Sheet",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Section::ALL.into_iter().find(|section| section.key() == key)
    }

    pub fn themes(&self) -> impl Iterator<Item = Theme> + '_ {
        Theme::ALL
            .into_iter()
            .filter(move |theme| theme.section() == *self)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Themed group of columns, rendered as one accordion panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Theme {
    Mou,
    ResourcePerson,
    Awards,
    Outreach,
    CollaborativeResearch,
    IndustrialVisit,
    FacultyInternship,
    StudentInternship,
    Workshop,
    Fdp,
    TechFest,
    ExpertTalk,
    AlumniInteraction,
    ResearchWork,
    ResearchCentre,
    FacultySummary,
    StudentSummary,
    DepartmentSummary,
}

impl Theme {
    pub const ALL: [Theme; 18] = [
        Theme::Mou,
        Theme::ResourcePerson,
        Theme::Awards,
        Theme::Outreach,
        Theme::CollaborativeResearch,
        Theme::IndustrialVisit,
        Theme::FacultyInternship,
        Theme::StudentInternship,
        Theme::Workshop,
        Theme::Fdp,
        Theme::TechFest,
        Theme::ExpertTalk,
        Theme::AlumniInteraction,
        Theme::ResearchWork,
        Theme::ResearchCentre,
        Theme::FacultySummary,
        Theme::StudentSummary,
        Theme::DepartmentSummary,
    ];

    pub fn section(&self) -> Section {
        match self {
            Theme::Mou
            | Theme::ResourcePerson
            | Theme::Awards
            | Theme::Outreach
            | Theme::CollaborativeResearch => Section::Mou,
            Theme::IndustrialVisit | Theme::FacultyInternship | Theme::StudentInternship => {
                Section::Industry
            }
            Theme::Workshop | Theme::Fdp | Theme::TechFest => Section::Workshops,
            Theme::ExpertTalk | Theme::AlumniInteraction => Section::Seminars,
            Theme::ResearchWork | Theme::ResearchCentre => Section::Research,
            Theme::FacultySummary | Theme::StudentSummary | Theme::DepartmentSummary => {
                Section::Summary
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Theme::Mou => "Memoranda of Understanding",
            Theme::ResourcePerson => "Faculty as Resource Person",
            Theme::Awards => "Awards and Recognitions",
            Theme::Outreach => "Outreach Activities",
            Theme::CollaborativeResearch => "Collaborative Research",
            Theme::IndustrialVisit => "Industrial Visits",
            Theme::FacultyInternship => "Faculty Internship",
            Theme::StudentInternship => "Student Internship",
            Theme::Workshop => "Workshops",
            Theme::Fdp => "Faculty Development Programmes",
            Theme::TechFest => "Technical Fest",
            Theme::ExpertTalk => "Expert Talks",
            Theme::AlumniInteraction => "Alumni Interaction",
            Theme::ResearchWork => "Research Projects and Proposals",
            Theme::ResearchCentre => "Research Centre Activities",
            Theme::FacultySummary => "Faculty Summary",
            Theme::StudentSummary => "Student Summary",
            Theme::DepartmentSummary => "Department Summary",
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static FieldDef> + '_ {
        FIELDS.iter().filter(move |field| field.theme == *self)
    }
}

/// One optional column of the submission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub theme: Theme,
}

const fn field(key: &'static str, label: &'static str, kind: FieldKind, theme: Theme) -> FieldDef {
    FieldDef {
        key,
        label,
        kind,
        theme,
    }
}

pub const FIELDS: &[FieldDef] = &[
    // MoU
    field("mou_org", "MoU signed with", Text, Theme::Mou),
    field("mou_date", "MoU date", Date, Theme::Mou),
    field("faculty_name", "Coordinated by", Text, Theme::Mou),
    field("designation", "Designation", Text, Theme::Mou),
    field("department", "Department", Text, Theme::Mou),
    field("mou_photos", "MoU photographs", Photos, Theme::Mou),
    // Faculty as resource person
    field("resource_event_name", "Event name", Text, Theme::ResourcePerson),
    field("resource_date", "Date", Date, Theme::ResourcePerson),
    field("resource_institution", "Institution", Text, Theme::ResourcePerson),
    field("resource_topic", "Topic", Text, Theme::ResourcePerson),
    field("session_chair", "Session chair", Text, Theme::ResourcePerson),
    field("boe_bos_member", "BOE/BOS member", Text, Theme::ResourcePerson),
    field("resource_photos", "Resource person photographs", Photos, Theme::ResourcePerson),
    // Awards
    field("best_paper_award", "Best paper award", LongText, Theme::Awards),
    field("award_research_title", "Research title", Text, Theme::Awards),
    field("award_conference_journal", "Conference / journal", Text, Theme::Awards),
    field("award_received", "Award received", LongText, Theme::Awards),
    field("award_name", "Award name", Text, Theme::Awards),
    field("award_given_by", "Awarded by", Text, Theme::Awards),
    field("award_photos", "Award certificates", Photos, Theme::Awards),
    // Outreach
    field("outreach_activity_name", "Activity name", Text, Theme::Outreach),
    field("outreach_place", "Place", Text, Theme::Outreach),
    field("outreach_date", "Date", Date, Theme::Outreach),
    field("outreach_photos", "Outreach photographs", Photos, Theme::Outreach),
    // Collaborative research
    field("collaborative_research_partner", "Partner", Text, Theme::CollaborativeResearch),
    field(
        "collaborative_research_description",
        "Description",
        LongText,
        Theme::CollaborativeResearch,
    ),
    // Industrial visits
    field("industrial_visit_department", "Department", Text, Theme::IndustrialVisit),
    field("industrial_visit_semester", "Semester", Text, Theme::IndustrialVisit),
    field("industrial_visit_place", "Place", Text, Theme::IndustrialVisit),
    field("industrial_visit_date", "Date", Date, Theme::IndustrialVisit),
    field("industrial_visit_students", "Number of students", Integer, Theme::IndustrialVisit),
    field(
        "industrial_visit_faculty_coordinators",
        "Faculty coordinators",
        Text,
        Theme::IndustrialVisit,
    ),
    field("industrial_visit_photos", "Visit photographs", Photos, Theme::IndustrialVisit),
    // Faculty internship
    field("faculty_internship_company", "Company", Text, Theme::FacultyInternship),
    field("faculty_internship_start_date", "Start date", Date, Theme::FacultyInternship),
    field("faculty_internship_end_date", "End date", Date, Theme::FacultyInternship),
    field(
        "faculty_internship_description",
        "Description",
        LongText,
        Theme::FacultyInternship,
    ),
    // Student internship
    field("student_internship_name", "Student name", Text, Theme::StudentInternship),
    field("student_internship_company", "Company", Text, Theme::StudentInternship),
    field("student_internship_start_date", "Start date", Date, Theme::StudentInternship),
    field("student_internship_end_date", "End date", Date, Theme::StudentInternship),
    // Workshops
    field("workshop_name", "Workshop name", Text, Theme::Workshop),
    field("workshop_start_date", "Start date", Date, Theme::Workshop),
    field("workshop_end_date", "End date", Date, Theme::Workshop),
    field("workshop_participants", "Participants", Integer, Theme::Workshop),
    field("workshop_resource_person", "Resource person", Text, Theme::Workshop),
    field("workshop_photos", "Workshop photographs", Photos, Theme::Workshop),
    // FDPs
    field("fdp_details", "Programme details", LongText, Theme::Fdp),
    field("fdp_duration", "Duration", Text, Theme::Fdp),
    field("fdp_resource_person", "Resource person", Text, Theme::Fdp),
    field("fdp_institution", "Institution", Text, Theme::Fdp),
    field("fdp_photos", "FDP photographs", Photos, Theme::Fdp),
    // Tech fest
    field("tech_fest_event_name", "Event name", Text, Theme::TechFest),
    field("tech_fest_date", "Date", Date, Theme::TechFest),
    field("tech_fest_participating_colleges", "Participating colleges", Integer, Theme::TechFest),
    field("tech_fest_details", "Details", LongText, Theme::TechFest),
    field("tech_fest_photos", "Fest photographs", Photos, Theme::TechFest),
    // Expert talks
    field("expert_talk_topic", "Topic", Text, Theme::ExpertTalk),
    field("expert_talk_speaker_name", "Speaker", Text, Theme::ExpertTalk),
    field("expert_talk_speaker_affiliation", "Speaker affiliation", Text, Theme::ExpertTalk),
    field("expert_talk_audience", "Audience size", Integer, Theme::ExpertTalk),
    field("expert_talk_date", "Date", Date, Theme::ExpertTalk),
    field("expert_talk_photos", "Talk photographs", Photos, Theme::ExpertTalk),
    // Alumni interaction
    field("alumni_name", "Alumni name", Text, Theme::AlumniInteraction),
    field("alumni_graduation_year", "Graduation year", Integer, Theme::AlumniInteraction),
    field("alumni_company", "Company", Text, Theme::AlumniInteraction),
    field("alumni_topic", "Topic", Text, Theme::AlumniInteraction),
    field("alumni_photos", "Interaction photographs", Photos, Theme::AlumniInteraction),
    // Research work
    field("research_title", "Research title", Text, Theme::ResearchWork),
    field("research_organization", "Organization", Text, Theme::ResearchWork),
    field("research_funding_organization", "Funding organization", Text, Theme::ResearchWork),
    field("research_date", "Date", Date, Theme::ResearchWork),
    field("research_approval_date", "Approval date", Date, Theme::ResearchWork),
    field("research_cost", "Total cost", Decimal, Theme::ResearchWork),
    field(
        "research_proposals_submitted",
        "Proposals submitted",
        LongText,
        Theme::ResearchWork,
    ),
    field("research_proposals_granted", "Proposals granted", LongText, Theme::ResearchWork),
    field("research_collaborative_partner", "Collaborative partner", Text, Theme::ResearchWork),
    field(
        "research_collaboration_duration",
        "Collaboration duration",
        Text,
        Theme::ResearchWork,
    ),
    field(
        "research_collaboration_outcomes",
        "Collaboration outcomes",
        LongText,
        Theme::ResearchWork,
    ),
    // Research centre
    field("research_center_activity_name", "Activity name", Text, Theme::ResearchCentre),
    field("research_center_activity_date", "Date", Date, Theme::ResearchCentre),
    field("research_center_participants", "Participants", Integer, Theme::ResearchCentre),
    field("research_center_details", "Details", LongText, Theme::ResearchCentre),
    field("research_center_photos", "Centre photographs", Photos, Theme::ResearchCentre),
    // Faculty summary
    field("conference_published", "Conference papers published", Integer, Theme::FacultySummary),
    field("journal_published", "Journal papers published", Integer, Theme::FacultySummary),
    field("books_published", "Books published", Integer, Theme::FacultySummary),
    field("faculty_books_chapters", "Book chapters", Integer, Theme::FacultySummary),
    field("fdps_attended", "FDPs/STTPs attended", Integer, Theme::FacultySummary),
    field("moocs_completed", "MOOCs completed", Integer, Theme::FacultySummary),
    field("nptel_completed", "NPTEL courses completed", Integer, Theme::FacultySummary),
    field(
        "faculty_collaborative_research",
        "Collaborative research",
        Integer,
        Theme::FacultySummary,
    ),
    field("faculty_expert_talks", "Expert talks", Integer, Theme::FacultySummary),
    field("faculty_alumni_talks", "Alumni talks", Integer, Theme::FacultySummary),
    field("faculty_industrial_visits", "Industrial visits", Integer, Theme::FacultySummary),
    field("faculty_mous_operational", "MoUs operational", Integer, Theme::FacultySummary),
    field(
        "faculty_consultancy_completed",
        "Consultancy completed",
        Integer,
        Theme::FacultySummary,
    ),
    field("faculty_edp_completed", "EDPs completed", Integer, Theme::FacultySummary),
    field("faculty_talks_delivered", "Talks delivered", Integer, Theme::FacultySummary),
    // Student summary
    field("student_conference_papers", "Conference papers", Integer, Theme::StudentSummary),
    field("student_journal_papers", "Journal papers", Integer, Theme::StudentSummary),
    field(
        "student_conferences_attended",
        "Conferences attended",
        Integer,
        Theme::StudentSummary,
    ),
    field("student_hackathons", "Hackathons", Integer, Theme::StudentSummary),
    field("student_moocs_completed", "MOOCs completed", Integer, Theme::StudentSummary),
    field("student_nptel_completed", "NPTEL courses completed", Integer, Theme::StudentSummary),
    field("student_aicte_participation", "AICTE participation", Integer, Theme::StudentSummary),
    field("student_achievements", "Student achievements", LongText, Theme::StudentSummary),
    // Department summary
    field("sports_events_count", "Sports events", Integer, Theme::DepartmentSummary),
    field("placement_companies", "Placement companies", Integer, Theme::DepartmentSummary),
    field("placement_ctc", "Placement CTC", Text, Theme::DepartmentSummary),
    field("hec_events_count", "HEC events", Integer, Theme::DepartmentSummary),
    field("ncc_bicep_events_count", "NCC/BICEP events", Integer, Theme::DepartmentSummary),
    field("other_initiatives", "Other initiatives", LongText, Theme::DepartmentSummary),
    field("attached_photos", "Other photographs", Photos, Theme::DepartmentSummary),
];

/// Columns shown in the admin table row; everything else goes to the detail panel.
pub const PRIMARY_COLUMNS: &[&str] = &[
    "mou_org",
    "mou_date",
    "faculty_name",
    "department",
    "best_paper_award",
    "award_received",
    "industrial_visit_department",
    "industrial_visit_semester",
    "workshop_name",
    "workshop_start_date",
    "fdp_details",
    "tech_fest_details",
    "research_title",
    "research_organization",
    "research_date",
    "research_proposals_submitted",
    "research_proposals_granted",
    "conference_published",
    "journal_published",
    "books_published",
    "fdps_attended",
    "moocs_completed",
    "nptel_completed",
    "other_initiatives",
    "student_achievements",
];

pub fn field_def(key: &str) -> Option<&'static FieldDef> {
    FIELDS.iter().find(|field| field.key == key)
}

pub fn primary_fields() -> impl Iterator<Item = &'static FieldDef> {
    PRIMARY_COLUMNS.iter().filter_map(|key| field_def(key))
}

/// Columns outside [`PRIMARY_COLUMNS`] belong to the detail panel.
pub fn is_primary(key: &str) -> bool {
    PRIMARY_COLUMNS.contains(&key)
}

pub fn photo_fields() -> impl Iterator<Item = &'static FieldDef> {
    FIELDS.iter().filter(|field| field.kind == FieldKind::Photos)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn catalogue_keys_are_unique() {
        let mut seen = HashSet::new();
        for field in FIELDS {
            assert!(seen.insert(field.key), "duplicate column {}", field.key);
        }
    }

    #[test]
    fn primary_columns_exist_and_are_not_photos() {
        for key in PRIMARY_COLUMNS {
            let def = field_def(key).unwrap_or_else(|| panic!("unknown primary column {key}"));
            assert_ne!(def.kind, FieldKind::Photos);
        }
        assert_eq!(
            primary_fields().count() + FIELDS.iter().filter(|f| !is_primary(f.key)).count(),
            FIELDS.len()
        );
    }

    #[test]
    fn every_theme_has_fields_and_sections_cover_all_themes() {
        for theme in Theme::ALL {
            assert!(theme.fields().next().is_some(), "{theme:?} has no fields");
        }
        let covered: usize = Section::ALL.iter().map(|s| s.themes().count()).sum();
        assert_eq!(covered, Theme::ALL.len());
    }

    #[test]
    fn section_keys_round_trip() {
        for section in Section::ALL {
            assert_eq!(Section::from_key(section.key()), Some(section));
        }
        assert_eq!(Section::from_key("unknown"), None);
    }
}
