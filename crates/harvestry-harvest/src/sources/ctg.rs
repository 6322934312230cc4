//! ClinicalTrials.gov study processor.
//!
//! Consumes one study document in the v2 API JSON shape
//! (https://clinicaltrials.gov/data-api/api): a `protocolSection` of named
//! modules plus `documentSection` / `derivedSection` and the `hasResults`
//! flag. The identification and status modules are mandatory — without both
//! the document is unusable and `process` returns `None`.

use chrono::{DateTime, Utc};
use serde_json::Value;

use harvestry_common::model::{
    AvailableIpd, DataObject, ObjectDataset, ObjectDate, ObjectInstance, ObjectTitle, Study,
    StudyContributor, StudyFeature, StudyIdentifier, StudyLink, StudyReference,
    StudyRelationship, StudyTitle, StudyTopic,
};
use harvestry_common::vocab::{self, org};

use super::{pretty_code, uniquify_title};
use crate::helpers::dates::{self, SplitDate};
use crate::helpers::{hash, html, idents, orgs};
use crate::reconcile;

const GSK_ACCESS_DETAILS: &str = "Following receipt of a signed Data Sharing Agreement (DSA), \
    researchers are provided access to anonymized patient-level data and supporting documentation in a \
    secure data access system, known as the SAS Clinical Trial Data Transparency (CTDT) system. \
    GSK may provide data directly to researchers where they are assured that the data will be secure";

const SERVIER_ACCESS_DETAILS: &str = "Servier will provide anonymized patient-level and study-level clinical trial data in response to \
    scientifically valid research proposals. Qualified scientific or medical researchers can submit a research \
    proposal to Servier after registering on the site. If the request is approved and before the transfer of data, \
    a so-called Data Sharing Agreement will have to be signed with Servier";

/// See-also labels that are boilerplate navigation, not study links.
const EXCLUDED_LINK_LABELS: [&str; 8] = [
    "To obtain contact information for a study center near you, click here.",
    "Researchers can use this site to request access to anonymised patient level data and/or supporting documents from clinical studies to conduct further research.",
    "University of Texas MD Anderson Cancer Center Website",
    "UT MD Anderson Cancer Center website",
    "Clinical Trials at Novo Nordisk",
    "Memorial Sloan Kettering Cancer Center",
    "AmgenTrials clinical trials website",
    "Mayo Clinic Clinical Trials",
];

pub fn parse(raw: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(raw)
}

fn text(v: &Value) -> Option<&str> {
    v.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// A typed date struct from the status module. Anticipated dates are not yet
/// realized facts and are discarded; estimated dates keep an "(est.)" marker
/// on their display string.
fn typed_date(module: &Value, key: &str) -> Option<SplitDate> {
    let st = &module[key];
    let date_type = text(&st["type"])?;
    if date_type.eq_ignore_ascii_case("anticipated") {
        return None;
    }
    let mut d = dates::parse_date_parts(text(&st["date"])?)?;
    if date_type.eq_ignore_ascii_case("estimate") || date_type.eq_ignore_ascii_case("estimated") {
        d.mark_estimated();
    }
    Some(d)
}

fn object_date(sd_oid: &str, type_id: i32, type_label: &str, d: &SplitDate) -> ObjectDate {
    ObjectDate {
        sd_oid: sd_oid.to_string(),
        date_type_id: type_id,
        date_type: type_label.to_string(),
        start_year: Some(d.year),
        start_month: d.month,
        start_day: d.day,
        date_as_string: Some(d.date_string.clone()),
    }
}

fn all_nines(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c == '9')
}

fn looks_like_date(text: &str) -> bool {
    lazy_static::lazy_static! {
        static ref DATE_SHAPE: regex::Regex =
            regex::Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap();
    }
    DATE_SHAPE.is_match(text)
}

/// Split an eligibility age like "18 Years" into value and normalized unit.
fn split_age(text: &str) -> Option<(i32, String, i32)> {
    let mut parts = text.trim().splitn(2, ' ');
    let value: i32 = parts.next()?.parse().ok()?;
    let mut unit = parts.next()?.trim().to_string();
    if !unit.ends_with('s') {
        unit.push('s');
    }
    let unit = pretty_code(&unit);
    let unit_id = vocab::time_units_id(&unit);
    Some((value, unit, unit_id))
}

pub fn process(doc: &Value, fetched: Option<DateTime<Utc>>) -> Option<Study> {
    let proto = &doc["protocolSection"];
    let id_mod = &proto["identificationModule"];
    let status_mod = &proto["statusModule"];

    // these two modules are fundamental; without both the record is unusable
    if id_mod.is_null() || status_mod.is_null() {
        return None;
    }
    let sid = text(&id_mod["nctId"])?.to_string();

    let mut s = Study::new(&sid, fetched);
    let mut identifiers: Vec<StudyIdentifier> = Vec::new();
    let mut titles: Vec<StudyTitle> = Vec::new();
    let mut contributors: Vec<StudyContributor> = Vec::new();
    let mut references: Vec<StudyReference> = Vec::new();
    let mut links: Vec<StudyLink> = Vec::new();
    let mut ipd_info: Vec<AvailableIpd> = Vec::new();
    let mut topics: Vec<StudyTopic> = Vec::new();
    let mut relationships: Vec<StudyRelationship> = Vec::new();
    let mut data_objects: Vec<DataObject> = Vec::new();
    let mut used_titles: Vec<String> = Vec::new();

    // ── Identification and status ─────────────────────────────────────────

    if let Some(status) = text(&status_mod["overallStatus"]) {
        let label = pretty_code(status);
        s.study_status_id = Some(vocab::study_status_id(&label));
        s.study_status = Some(label);
    }
    let status_verified_date = text(&status_mod["statusVerifiedDate"]).map(str::to_string);

    // the NCT identifier itself; first-submitted date taken as assignment date
    let mut nct_id = StudyIdentifier::new(
        &sid, &sid, 11, "Trial Registry ID",
        Some(org::CLINICAL_TRIALS_GOV), Some("ClinicalTrials.gov"),
    );
    nct_id.identifier_date =
        text(&status_mod["studyFirstSubmitDate"]).and_then(dates::standardise_date_format);
    identifiers.push(nct_id);

    // titles, in default-selection priority order
    let brief_title = text(&id_mod["briefTitle"]).map(html::normalise_markup);
    let official_title = text(&id_mod["officialTitle"]).map(html::normalise_markup);
    let acronym = text(&id_mod["acronym"]);

    let mut default_found = false;
    if let Some((t, _)) = &brief_title {
        titles.push(StudyTitle::new(&sid, t, 15, "Public Title", true));
        default_found = true;
    }
    if let Some((t, _)) = &official_title {
        titles.push(StudyTitle::new(&sid, t, 17, "Protocol Title", !default_found));
        default_found = true;
    }
    if let Some(t) = acronym {
        titles.push(StudyTitle::new(&sid, t, 14, "Acronym or Abbreviation", !default_found));
    }
    s.display_title = brief_title
        .as_ref()
        .or(official_title.as_ref())
        .map(|(t, _)| t.clone());
    s.title_lang_code = Some("en".to_string());

    // sponsor organisation's own study id
    let organisation = text(&id_mod["organization"]["fullName"])
        .map(|o| orgs::tidy_org_name(o, &sid));
    let org_study_id = text(&id_mod["orgStudyIdInfo"]["id"]).map(str::to_string);
    let org_id_type = text(&id_mod["orgStudyIdInfo"]["type"]);
    let org_id_link = text(&id_mod["orgStudyIdInfo"]["link"]);

    if let Some(ref osid) = org_study_id {
        let mut ident = if matches!(org_id_type, Some(t) if t.eq_ignore_ascii_case("nih")
            || t.eq_ignore_ascii_case("u.s. nih grant/contract"))
        {
            StudyIdentifier::new(&sid, osid, 13, "Funder's ID",
                Some(org::NIH), Some("National Institutes of Health"))
        } else {
            let org_label = organisation
                .as_deref()
                .map(orgs::deredact)
                .unwrap_or_default();
            StudyIdentifier::new(&sid, osid, 14, "Sponsor's ID", None,
                (!org_label.is_empty()).then_some(org_label.as_str()))
        };
        ident.identifier_link = org_id_link.map(str::to_string);
        identifiers.push(ident);
    }

    // additional identifiers, unless already used as the sponsor id
    if let Some(sec_ids) = id_mod["secondaryIdInfos"].as_array() {
        for sec in sec_ids {
            let Some(value) = text(&sec["id"]) else { continue };
            if let Some(ref osid) = org_study_id {
                if value.eq_ignore_ascii_case(osid.trim()) {
                    continue;
                }
            }
            let domain = text(&sec["domain"]).map(|d| orgs::tidy_org_name(d, &sid));
            let idd = idents::classify_identifier(text(&sec["type"]), domain.as_deref(), value);
            let mut ident = StudyIdentifier::new(
                &sid, &idd.id_value, idd.id_type_id, &idd.id_type,
                idd.id_org_id, idd.id_org.as_deref(),
            );
            ident.identifier_link = text(&sec["link"]).map(str::to_string);
            identifiers.push(ident);
        }
    }

    // the three registry entry dates, plus the study start date
    let firstpost = typed_date(status_mod, "studyFirstPostDateStruct");
    let resultspost = typed_date(status_mod, "resultsFirstPostDateStruct");
    let updatepost = typed_date(status_mod, "lastUpdatePostDateStruct");

    if let Some(start) = typed_date(status_mod, "startDateStruct") {
        s.study_start_year = Some(start.year);
        s.study_start_month = start.month;
    }

    // expanded access studies are registered under their own NCT id
    if let Some(ea_id) = text(&status_mod["expandedAccessInfo"]["nctId"]) {
        relationships.push(StudyRelationship::new(
            &sid, 23, "has an expanded access version", ea_id));
        relationships.push(StudyRelationship::new(
            ea_id, 24, "is an expanded access version of", &sid));
    }

    // ── Sponsors and contributors ─────────────────────────────────────────

    let mut sponsor_name: Option<String> = None;
    let sc_mod = &proto["sponsorCollaboratorsModule"];
    if !sc_mod.is_null() {
        if let Some(candidate) = text(&sc_mod["leadSponsor"]["name"]) {
            if !orgs::is_null_org_name(candidate) {
                let name = orgs::deredact(&orgs::tidy_org_name(candidate, &sid));
                contributors.push(StudyContributor::organisation(
                    &sid, 54, "Trial Sponsor", None, &name));
                sponsor_name = Some(name);
            }
        }

        let rp = &sc_mod["responsibleParty"];
        let rp_type = text(&rp["type"]).unwrap_or("").to_uppercase();
        if !rp.is_null() && rp_type != "SPONSOR" {
            let rp_name = text(&rp["investigatorFullName"])
                .or_else(|| text(&rp["oldNameTitle"]));
            let rp_affil = text(&rp["investigatorAffiliation"])
                .or_else(|| text(&rp["oldOrganization"]));
            if let Some(name) = rp_name {
                if name != orgs::REDACTED {
                    let name = orgs::tidy_person_name(name);
                    if rp_type.contains("PRINCIPAL") {
                        contributors.push(StudyContributor::person(
                            &sid, 51, "Study Lead", &name, rp_affil));
                    } else if rp_type.contains("SPONSOR_INVESTIGATOR") {
                        contributors.push(StudyContributor::person(
                            &sid, 70, "Sponsor-investigator", &name, rp_affil));
                    }
                }
            }
        }

        if let Some(collabs) = sc_mod["collaborators"].as_array() {
            for collab in collabs {
                if let Some(candidate) = text(&collab["name"]) {
                    if !orgs::is_null_org_name(candidate) {
                        let name = orgs::tidy_org_name(candidate, &sid);
                        contributors.push(StudyContributor::organisation(
                            &sid, 69, "Collaborating organisation", None, &name));
                    }
                }
            }
        }
    }

    // ── Description and topics ────────────────────────────────────────────

    if let Some(summary) = text(&proto["descriptionModule"]["briefSummary"]) {
        let (desc, had_markup) = html::normalise_markup(summary);
        s.brief_description = Some(desc);
        s.bd_contains_html = had_markup;
    }

    let derived = &doc["derivedSection"];
    if let Some(meshes) = derived["conditionBrowseModule"]["meshes"].as_array() {
        for mesh in meshes {
            if let (Some(code), Some(term)) = (text(&mesh["id"]), text(&mesh["term"])) {
                let mut topic = StudyTopic::coded(&sid, 13, "condition", term, None, "MeSH", code);
                topic.comments = Some("browse list".to_string());
                topics.push(topic);
            }
        }
    }
    if let Some(meshes) = derived["interventionBrowseModule"]["meshes"].as_array() {
        for mesh in meshes {
            if let (Some(code), Some(term)) = (text(&mesh["id"]), text(&mesh["term"])) {
                let mut topic =
                    StudyTopic::coded(&sid, 12, "chemical / agent", term, None, "MeSH", code);
                topic.comments = Some("browse list".to_string());
                topics.push(topic);
            }
        }
    }

    let cond_mod = &proto["conditionsModule"];
    if let Some(conditions) = cond_mod["conditions"].as_array() {
        for condition in conditions.iter().filter_map(text) {
            // skip names already present in the MeSH coded conditions
            if reconcile::topic_is_new(&topics, condition) {
                topics.push(StudyTopic::new(&sid, 13, "condition", condition));
            }
        }
    }
    if let Some(keywords) = cond_mod["keywords"].as_array() {
        for keyword in keywords.iter().filter_map(text) {
            if reconcile::topic_is_new(&topics, keyword) {
                topics.push(StudyTopic::new(&sid, 11, "keyword", keyword));
            }
        }
    }

    // ── Design, enrolment, eligibility ────────────────────────────────────

    let design = &proto["designModule"];
    let mut features = Vec::new();
    if !design.is_null() {
        let study_type = text(&design["studyType"]).map(pretty_code);
        if let Some(ref t) = study_type {
            s.study_type_id = Some(vocab::study_type_id(t));
            s.study_type = Some(t.clone());
        }
        let design_info = &design["designInfo"];

        if study_type.as_deref() == Some("Interventional") {
            match design["phases"].as_array().filter(|p| !p.is_empty()) {
                Some(phases) => {
                    for phase in phases.iter().filter_map(text) {
                        let label = pretty_code(phase);
                        features.push(StudyFeature::new(
                            &sid, 20, "phase", vocab::phase_id(&label), &label));
                    }
                }
                None => features.push(StudyFeature::new(
                    &sid, 20, "phase", vocab::phase_id("Not provided"), "Not provided")),
            }

            let allocation = text(&design_info["allocation"])
                .map(pretty_code)
                .unwrap_or_else(|| "Not provided".to_string());
            features.push(StudyFeature::new(
                &sid, 22, "allocation type", vocab::allocation_type_id(&allocation), &allocation));

            let model = text(&design_info["interventionModel"])
                .map(pretty_code)
                .unwrap_or_else(|| "Not provided".to_string());
            features.push(StudyFeature::new(
                &sid, 23, "intervention model", vocab::design_type_id(&model), &model));

            let purpose = text(&design_info["primaryPurpose"])
                .map(pretty_code)
                .unwrap_or_else(|| "Not provided".to_string());
            features.push(StudyFeature::new(
                &sid, 21, "primary purpose", vocab::primary_purpose_id(&purpose), &purpose));

            let masking = text(&design_info["maskingInfo"]["masking"])
                .map(pretty_code)
                .unwrap_or_else(|| "Not provided".to_string());
            features.push(StudyFeature::new(
                &sid, 24, "masking", vocab::masking_type_id(&masking), &masking));
        }

        if study_type.as_deref() == Some("Observational") {
            if design["patientRegistry"].as_bool() == Some(true) {
                s.study_type_id = Some(13);
                s.study_type = Some("Observational Patient Registry".to_string());
            }

            let obs_model = text(&design_info["observationalModel"])
                .map(pretty_code)
                .unwrap_or_else(|| "Not provided".to_string());
            features.push(StudyFeature::new(
                &sid, 30, "observational model", vocab::obs_model_type_id(&obs_model), &obs_model));

            let perspective = text(&design_info["timePerspective"])
                .map(pretty_code)
                .unwrap_or_else(|| "Not provided".to_string());
            features.push(StudyFeature::new(
                &sid, 31, "time perspective", vocab::time_perspective_id(&perspective), &perspective));

            if let Some(retention) = text(&design["bioSpec"]["retention"]).map(pretty_code) {
                features.push(StudyFeature::new(
                    &sid, 32, "biospecimens retained",
                    vocab::biospec_retention_id(&retention), &retention));
            }
        }

        // enrolment count, rejecting sentinel and date-shaped values
        let enrol_text = match &design["enrollmentInfo"]["count"] {
            Value::Number(n) => Some(n.to_string()),
            Value::String(t) => Some(t.trim().to_string()),
            _ => None,
        };
        if let Some(enrol_text) = enrol_text {
            if !looks_like_date(&enrol_text) {
                if let Ok(enrolment) = enrol_text.parse::<i32>() {
                    if enrolment <= 1000 || !all_nines(&enrol_text) {
                        s.study_enrolment = Some(enrolment);
                    }
                }
            }
        }
    }

    let elig = &proto["eligibilityModule"];
    if !elig.is_null() {
        let gender = text(&elig["sex"]).map(pretty_code).unwrap_or_else(|| "Not provided".into());
        let gender = if gender == "All" { "Both".to_string() } else { gender };
        s.study_gender_elig_id = Some(vocab::gender_elig_id(&gender));
        s.study_gender_elig = Some(gender);

        if let Some((age, unit, unit_id)) = text(&elig["minimumAge"]).and_then(split_age) {
            s.min_age = Some(age);
            s.min_age_units_id = Some(unit_id);
            s.min_age_units = Some(unit);
        }
        if let Some((age, unit, unit_id)) = text(&elig["maximumAge"]).and_then(split_age) {
            s.max_age = Some(age);
            s.max_age_units_id = Some(unit_id);
            s.max_age_units = Some(unit);
        }
    }

    if let Some(officials) = proto["contactsLocationsModule"]["overallOfficials"].as_array() {
        for official in officials {
            if let Some(name) = text(&official["name"]) {
                let name = orgs::tidy_person_name(name);
                contributors.push(StudyContributor::person(
                    &sid, 51, "Study Lead", &name, text(&official["affiliation"])));
            }
        }
    }

    // ── IPD sharing statement ─────────────────────────────────────────────

    let ipd_mod = &proto["ipdSharingStatementModule"];
    if let Some(description) = text(&ipd_mod["description"]) {
        let mut statement = format!(
            "(As of {}): {}",
            status_verified_date.as_deref().unwrap_or("unstated date"),
            description
        );
        if let Some(tf) = text(&ipd_mod["timeFrame"]) {
            statement.push_str(&format!("\nTime frame: {tf}"));
        }
        if let Some(ac) = text(&ipd_mod["accessCriteria"]) {
            statement.push_str(&format!("\nAccess Criteria: {ac}"));
        }
        if let Some(url) = text(&ipd_mod["url"]) {
            statement.push_str(&format!("\nURL: {url}"));
        }
        if let Some(info_types) = ipd_mod["infoTypes"].as_array() {
            let list: Vec<&str> = info_types.iter().filter_map(text).collect();
            if !list.is_empty() {
                statement.push_str(&format!("\nInformation available: {}", list.join(", ")));
            }
        }
        s.data_sharing_statement = Some(statement);
    }

    // ── Linked data objects ───────────────────────────────────────────────

    let (title_base, title_type_id, title_type) = match (&brief_title, &official_title) {
        (Some((t, _)), _) => (t.clone(), 22, "Study short name :: object type"),
        (None, Some((t, _))) => (t.clone(), 24, "Study scientific name :: object type"),
        _ => (sid.clone(), 26, "Study registry ID :: object type"),
    };

    // the registry entry itself
    let object_display_title =
        uniquify_title(format!("{title_base} :: CTG Registry entry"), &mut used_titles);
    let sd_oid = hash::object_hash(&sid, &object_display_title);
    let mut registry_obj = DataObject {
        sd_oid: sd_oid.clone(),
        sd_sid: sid.clone(),
        display_title: object_display_title.clone(),
        publication_year: firstpost.as_ref().map(|d| d.year),
        object_class_id: 23,
        object_class: "Text".to_string(),
        object_type_id: 13,
        object_type: "Trial Registry entry".to_string(),
        managing_org_id: Some(org::CLINICAL_TRIALS_GOV),
        managing_org: Some("ClinicalTrials.gov".to_string()),
        access_type_id: Some(12),
        access_type: Some("Public on-screen access".to_string()),
        datetime_of_data_fetch: fetched,
        titles: vec![ObjectTitle::new(
            &sd_oid, &object_display_title, title_type_id, title_type, true)],
        instances: vec![ObjectInstance::new(
            &sd_oid,
            Some(org::CLINICAL_TRIALS_GOV),
            Some("ClinicalTrials.gov"),
            &format!("https://clinicaltrials.gov/study/{sid}"),
            39,
            "Web text with XML or JSON via API",
        )],
        ..Default::default()
    };
    if let Some(ref d) = firstpost {
        registry_obj.dates.push(object_date(&sd_oid, 12, "Available", d));
    }
    if let Some(ref d) = updatepost {
        registry_obj.dates.push(object_date(&sd_oid, 18, "Updated", d));
    }
    data_objects.push(registry_obj);

    // a results summary entry, when results data has been posted
    let results_present = doc["hasResults"].as_bool() == Some(true);
    if results_present && resultspost.is_some() {
        let object_display_title =
            uniquify_title(format!("{title_base} :: CTG Results entry"), &mut used_titles);
        let sd_oid = hash::object_hash(&sid, &object_display_title);
        let mut results_obj = DataObject {
            sd_oid: sd_oid.clone(),
            sd_sid: sid.clone(),
            display_title: object_display_title.clone(),
            publication_year: resultspost.as_ref().map(|d| d.year),
            object_class_id: 23,
            object_class: "Text".to_string(),
            object_type_id: 28,
            object_type: "Trial registry results summary".to_string(),
            managing_org_id: Some(org::CLINICAL_TRIALS_GOV),
            managing_org: Some("ClinicalTrials.gov".to_string()),
            access_type_id: Some(12),
            access_type: Some("Public on-screen access".to_string()),
            datetime_of_data_fetch: fetched,
            titles: vec![ObjectTitle::new(
                &sd_oid, &object_display_title, title_type_id, title_type, true)],
            instances: vec![ObjectInstance::new(
                &sd_oid,
                Some(org::CLINICAL_TRIALS_GOV),
                Some("ClinicalTrials.gov"),
                &format!("https://clinicaltrials.gov/study/{sid}?tab=results"),
                39,
                "Web text with XML or JSON via API",
            )],
            ..Default::default()
        };
        if let Some(ref d) = resultspost {
            results_obj.dates.push(object_date(&sd_oid, 12, "Available", d));
        }
        if let Some(ref d) = updatepost {
            results_obj.dates.push(object_date(&sd_oid, 18, "Updated", d));
        }
        data_objects.push(results_obj);
    }

    // uploaded study documents (protocols, SAPs, consent forms)
    if let Some(large_docs) = doc["documentSection"]["largeDocumentModule"]["largeDocs"].as_array()
    {
        for large_doc in large_docs {
            let type_abbrev = text(&large_doc["typeAbbrev"]).unwrap_or("");
            let (object_type_id, object_type) = match type_abbrev {
                "Prot"         => (11, "Study Protocol".to_string()),
                "SAP"          => (22, "Statistical analysis plan".to_string()),
                "ICF"          => (18, "Informed consent forms".to_string()),
                "Prot_SAP"     => (74, "Protocol SAP".to_string()),
                "Prot_ICF"     => (75, "Protocol ICF".to_string()),
                "Prot_SAP_ICF" => (76, "Protocol SAP ICF".to_string()),
                other          => (37, other.to_string()),
            };
            let doc_date = text(&large_doc["date"]).and_then(dates::parse_date_parts);
            let upload_date = text(&large_doc["uploadDate"]).and_then(dates::parse_iso_date);

            let (candidate, t_type_id, t_type) = match text(&large_doc["label"]) {
                Some(label) => (format!("{title_base} :: {label}"),
                    21, "Study short name :: object name"),
                None => (format!("{title_base} :: {object_type}"),
                    22, "Study short name :: object type"),
            };
            let object_display_title = uniquify_title(candidate, &mut used_titles);
            let sd_oid = hash::object_hash(&sid, &object_display_title);

            let mut doc_obj = DataObject {
                sd_oid: sd_oid.clone(),
                sd_sid: sid.clone(),
                display_title: object_display_title.clone(),
                publication_year: doc_date.as_ref().map(|d| d.year),
                object_class_id: 23,
                object_class: "Text".to_string(),
                object_type_id,
                object_type: object_type.clone(),
                managing_org_id: Some(org::CLINICAL_TRIALS_GOV),
                managing_org: Some("ClinicalTrials.gov".to_string()),
                access_type_id: Some(11),
                access_type: Some("Public download".to_string()),
                datetime_of_data_fetch: fetched,
                titles: vec![ObjectTitle::new(
                    &sd_oid, &object_display_title, t_type_id, t_type, true)],
                ..Default::default()
            };
            if let Some(ref d) = doc_date {
                doc_obj.dates.push(object_date(&sd_oid, 15, "Created", d));
            }
            if let Some(ref d) = upload_date {
                doc_obj.dates.push(object_date(&sd_oid, 12, "Available", d));
            }
            if let Some(file_name) = text(&large_doc["filename"]) {
                let suffix = &sid[sid.len().saturating_sub(2)..];
                doc_obj.instances.push(ObjectInstance::new(
                    &sd_oid,
                    Some(org::CLINICAL_TRIALS_GOV),
                    Some("ClinicalTrials.gov"),
                    &format!("https://clinicaltrials.gov/ProvidedDocs/{suffix}/{sid}/{file_name}"),
                    11,
                    "PDF",
                ));
            }
            data_objects.push(doc_obj);
        }
    }

    // ── References, available IPD and see-also links ──────────────────────

    let refs_mod = &proto["referencesModule"];
    if let Some(refs) = refs_mod["references"].as_array() {
        for reference in refs {
            if text(&reference["type"]).is_some_and(|t| t.eq_ignore_ascii_case("result")) {
                references.push(StudyReference::new(
                    &sid, text(&reference["pmid"]), text(&reference["citation"]), None, None));
            }
            if let Some(retractions) = reference["retractions"].as_array() {
                for retraction in retractions {
                    references.push(StudyReference::new(
                        &sid,
                        text(&retraction["pmid"]),
                        text(&retraction["source"]),
                        None,
                        Some("RETRACTION"),
                    ));
                }
            }
        }
    }

    if let Some(avail_ipds) = refs_mod["availIpds"].as_array() {
        for avail in avail_ipds {
            let ipd_id = text(&avail["id"]);
            let ipd_type = text(&avail["type"]).unwrap_or("");
            let ipd_url = text(&avail["url"]).unwrap_or("");
            let ipd_comment = text(&avail["comment"]);

            if ipd_url.contains("clinicalstudydatarequest.com") {
                // usually a GSK store
                let (object_type_id, object_type) = match ipd_type {
                    "Informed Consent Form"           => (18, "Informed consent forms"),
                    "Dataset Specification"           => (31, "Data Dictionary"),
                    "Annotated Case Report Form"      => (30, "Annotated Data Collection Forms"),
                    "Statistical Analysis Plan"       => (22, "Statistical analysis plan"),
                    "Individual Participant Data Set" => (80, "Individual Participant Data"),
                    "Clinical Study Report"           => (26, "Clinical Study Report"),
                    "Study Protocol"                  => (11, "Study Protocol"),
                    other                             => (37, other),
                };
                let is_dataset = object_type_id == 80;
                let is_gsk = matches!(sponsor_name.as_deref(), Some("GlaxoSmithKline") | Some("GSK"));
                let (sponsor_org_id, t_base) = if is_gsk {
                    (Some(org::GSK), "GSK-".to_string())
                } else {
                    (None, sponsor_name.as_deref().map(|sp| format!("{sp}-")).unwrap_or_default())
                };

                let (candidate_base, t_type_id, t_type) = match ipd_id {
                    Some(id) => (format!("{t_base}{id}"), 20, "Unique data object title"),
                    None => (title_base.clone(), 22, "Study short name :: object type"),
                };
                let object_display_title = uniquify_title(
                    format!("{candidate_base} :: {object_type}"), &mut used_titles);
                let sd_oid = hash::object_hash(&sid, &object_display_title);

                let dataset = is_dataset.then(|| {
                    if is_gsk {
                        ObjectDataset {
                            sd_oid: sd_oid.clone(),
                            record_keys_type_id: 3,
                            record_keys_type: "Anonymised".to_string(),
                            record_keys_details: Some(
                                "GSK states that... 'researchers are provided access to \
                                 anonymized patient-level data'".to_string()),
                            deident_type_id: 2,
                            deident_type: "De-identification applied".to_string(),
                            deident_details: None,
                            consent_type_id: 0,
                            consent_type: "Not known".to_string(),
                            consent_details: None,
                        }
                    } else {
                        ObjectDataset {
                            sd_oid: sd_oid.clone(),
                            record_keys_type_id: 0,
                            record_keys_type: "Not known".to_string(),
                            deident_type_id: 0,
                            deident_type: "Not known".to_string(),
                            consent_type_id: 0,
                            consent_type: "Not known".to_string(),
                            ..Default::default()
                        }
                    }
                });

                data_objects.push(DataObject {
                    sd_oid: sd_oid.clone(),
                    sd_sid: sid.clone(),
                    display_title: object_display_title.clone(),
                    object_class_id: if is_dataset { 14 } else { 23 },
                    object_class: if is_dataset { "Dataset" } else { "Text" }.to_string(),
                    object_type_id,
                    object_type: object_type.to_string(),
                    managing_org_id: sponsor_org_id,
                    managing_org: sponsor_name.clone(),
                    access_type_id: Some(17),
                    access_type: Some("Case by case download".to_string()),
                    access_details: Some(GSK_ACCESS_DETAILS.to_string()),
                    access_details_url: Some(
                        "https://clinicalstudydatarequest.com/Help/Help-How-to-Request-Data.aspx"
                            .to_string()),
                    datetime_of_data_fetch: fetched,
                    titles: vec![ObjectTitle::new(
                        &sd_oid, &object_display_title, t_type_id, t_type, true)],
                    dataset,
                    ..Default::default()
                });
            } else if ipd_url.contains("servier.com") {
                let (object_type_id, object_type) =
                    if ipd_type.to_lowercase().contains("study-level clinical trial data") {
                        (69, "Aggregated result dataset")
                    } else {
                        match ipd_type {
                            "Informed Consent Form"           => (18, "Informed consent forms"),
                            "Statistical Analysis Plan"       => (22, "Statistical analysis plan"),
                            "Individual Participant Data Set" => (80, "Individual Participant Data"),
                            "Clinical Study Report"           => (26, "Clinical Study Report"),
                            "Study Protocol"                  => (11, "Study Protocol"),
                            other                             => (37, other),
                        }
                    };
                let is_dataset = object_type_id == 80 || object_type_id == 69;
                let object_display_title = uniquify_title(
                    format!("{title_base} :: {object_type}"), &mut used_titles);
                let sd_oid = hash::object_hash(&sid, &object_display_title);

                let dataset = (object_type_id == 80).then(|| ObjectDataset {
                    sd_oid: sd_oid.clone(),
                    record_keys_type_id: 3,
                    record_keys_type: "Anonymised".to_string(),
                    record_keys_details: Some(
                        "Servier states that... 'Servier will provide anonymized patient-level \
                         and study-level clinical trial data'".to_string()),
                    deident_type_id: 2,
                    deident_type: "De-identification applied".to_string(),
                    deident_details: None,
                    consent_type_id: 0,
                    consent_type: "Not known".to_string(),
                    consent_details: None,
                });

                data_objects.push(DataObject {
                    sd_oid: sd_oid.clone(),
                    sd_sid: sid.clone(),
                    display_title: object_display_title.clone(),
                    object_class_id: if is_dataset { 14 } else { 23 },
                    object_class: if is_dataset { "Dataset" } else { "Text" }.to_string(),
                    object_type_id,
                    object_type: object_type.to_string(),
                    managing_org_id: Some(org::SERVIER),
                    managing_org: Some("Servier".to_string()),
                    access_type_id: Some(18),
                    access_type: Some("Case by case on-screen access".to_string()),
                    access_details: Some(SERVIER_ACCESS_DETAILS.to_string()),
                    access_details_url: Some(
                        "https://clinicaltrials.servier.com/data-request-portal/".to_string()),
                    datetime_of_data_fetch: fetched,
                    titles: vec![ObjectTitle::new(
                        &sd_oid, &object_display_title, 22,
                        "Study short name :: object type", true)],
                    dataset,
                    ..Default::default()
                });
            } else if ipd_url.contains("merck.com") {
                // only the access-tab entries lead to an actual document
                if ipd_url.contains("&tab=access") {
                    let object_display_title = uniquify_title(
                        format!("{title_base} :: CSR Summary"), &mut used_titles);
                    let sd_oid = hash::object_hash(&sid, &object_display_title);
                    let mut instance = ObjectInstance::new(
                        &sd_oid, Some(org::MERCK), Some("Merck Sharp & Dohme Corp."),
                        ipd_url, 11, "PDF");
                    instance.instance_type_id = Some(4);
                    instance.instance_type = Some("Summary version".to_string());

                    data_objects.push(DataObject {
                        sd_oid: sd_oid.clone(),
                        sd_sid: sid.clone(),
                        display_title: object_display_title.clone(),
                        object_class_id: 23,
                        object_class: "Text".to_string(),
                        object_type_id: 79,
                        object_type: "CSR Summary".to_string(),
                        managing_org_id: Some(org::MERCK),
                        managing_org: Some("Merck Sharp & Dohme".to_string()),
                        access_type_id: Some(11),
                        access_type: Some("Public download".to_string()),
                        datetime_of_data_fetch: fetched,
                        titles: vec![ObjectTitle::new(
                            &sd_oid, &object_display_title, 22,
                            "Study short name :: object type", true)],
                        instances: vec![instance],
                        ..Default::default()
                    });
                }
            } else {
                // kept for future processing
                ipd_info.push(AvailableIpd {
                    sd_sid: sid.clone(),
                    ipd_id: ipd_id.map(str::to_string),
                    ipd_type: (!ipd_type.is_empty()).then(|| ipd_type.to_string()),
                    ipd_url: (!ipd_url.is_empty()).then(|| ipd_url.to_string()),
                    ipd_comment: ipd_comment.map(str::to_string),
                });
            }
        }
    }

    if let Some(see_also) = refs_mod["seeAlsoLinks"].as_array() {
        for link in see_also {
            let label = text(&link["label"]);
            let Some(url) = text(&link["url"]) else { continue };
            let url = url.trim_end_matches('/').to_string();
            let mut add_to_db = true;

            if label == Some("NIH Clinical Center Detailed Web Page") && url.ends_with(".html") {
                let object_display_title = uniquify_title(
                    format!("{title_base} :: Study Overview"), &mut used_titles);
                let sd_oid = hash::object_hash(&sid, &object_display_title);
                data_objects.push(DataObject {
                    sd_oid: sd_oid.clone(),
                    sd_sid: sid.clone(),
                    display_title: object_display_title.clone(),
                    object_class_id: 23,
                    object_class: "Text".to_string(),
                    object_type_id: 38,
                    object_type: "Study Overview".to_string(),
                    managing_org_id: Some(org::NIH_CLINICAL_CENTER),
                    managing_org: Some("National Institutes of Health Clinical Center".to_string()),
                    access_type_id: Some(12),
                    access_type: Some("Public on-screen access".to_string()),
                    datetime_of_data_fetch: fetched,
                    titles: vec![ObjectTitle::new(
                        &sd_oid, &object_display_title, 22,
                        "Study short name :: object type", true)],
                    instances: vec![ObjectInstance::new(
                        &sd_oid, Some(org::NIH_CLINICAL_CENTER),
                        Some("National Institutes of Health Clinical Center"),
                        &url, 35, "Web text")],
                    ..Default::default()
                });
                add_to_db = false;
            }

            if url.to_lowercase().contains("filehosting.pharmacm.com/download") {
                let test_url = url.to_lowercase();
                let mut object_type_id = 0;
                let mut object_type = "";
                let mut instance_type_id = 1;
                let mut instance_type = "Full resource";

                if test_url.contains("csr")
                    || (test_url.contains("study") && test_url.contains("report"))
                {
                    if test_url.contains("redacted") {
                        object_type_id = 27; object_type = "Redacted Clinical Study Report";
                        instance_type_id = 5; instance_type = "Redacted version";
                    } else if test_url.contains("summary") {
                        object_type_id = 79; object_type = "CSR Summary";
                        instance_type_id = 4; instance_type = "Summary version";
                    } else {
                        object_type_id = 26; object_type = "Clinical Study Report";
                    }
                } else if test_url.contains("csp") || test_url.contains("protocol") {
                    if test_url.contains("redacted") {
                        object_type_id = 42; object_type = "Redacted Protocol";
                        instance_type_id = 5; instance_type = "Redacted version";
                    } else {
                        object_type_id = 11; object_type = "Study Protocol";
                    }
                } else if test_url.contains("sap") || test_url.contains("analysis") {
                    if test_url.contains("redacted") {
                        object_type_id = 43; object_type = "Redacted SAP";
                        instance_type_id = 5; instance_type = "Redacted version";
                    } else {
                        object_type_id = 22; object_type = "Statistical analysis plan";
                    }
                } else if test_url.contains("summary") || test_url.contains("rds") {
                    object_type_id = 79; object_type = "CSR Summary";
                    instance_type_id = 4; instance_type = "Summary version";
                } else if test_url.contains("poster") {
                    object_type_id = 108; object_type = "Conference Poster";
                }

                if object_type_id > 0 && sponsor_name.is_some() {
                    let object_display_title = uniquify_title(
                        format!("{title_base} :: {object_type}"), &mut used_titles);
                    let sd_oid = hash::object_hash(&sid, &object_display_title);
                    let mut instance = ObjectInstance::new(
                        &sd_oid, Some(org::TRIALSCOPE), Some("TrialScope Disclose"),
                        &url, 11, "PDF");
                    instance.instance_type_id = Some(instance_type_id);
                    instance.instance_type = Some(instance_type.to_string());

                    data_objects.push(DataObject {
                        sd_oid: sd_oid.clone(),
                        sd_sid: sid.clone(),
                        display_title: object_display_title.clone(),
                        object_class_id: 23,
                        object_class: "Text".to_string(),
                        object_type_id,
                        object_type: object_type.to_string(),
                        managing_org_id: None,
                        managing_org: sponsor_name.clone(),
                        access_type_id: Some(11),
                        access_type: Some("Public download".to_string()),
                        datetime_of_data_fetch: fetched,
                        titles: vec![ObjectTitle::new(
                            &sd_oid, &object_display_title, 22,
                            "Study short name :: object type", true)],
                        instances: vec![instance],
                        ..Default::default()
                    });
                }
            }

            if let Some(label) = label {
                if EXCLUDED_LINK_LABELS.contains(&label) {
                    add_to_db = false;
                }
            }
            if url == "http://trials.boehringer-ingelheim.com" {
                add_to_db = false;
            }
            if label.is_none() && (url.ends_with(".com") || url.ends_with(".org")) {
                add_to_db = false;
            }

            if add_to_db {
                let tidied_label = label.map(|l| {
                    l.trim()
                        .trim_matches('"')
                        .trim_start_matches("((").trim_end_matches("))")
                        .trim_start_matches('(').trim_end_matches(')')
                        .trim_start_matches('|')
                        .trim_start_matches('.')
                        .trim_start_matches(':')
                        .trim()
                        .to_string()
                });
                links.push(StudyLink::new(&sid, tidied_label.as_deref(), &url));
            }
        }
    }

    // reassign organisation-tagged contributors that are actually people,
    // and resolve the registry's "Sponsor" placeholder to the sponsor name
    for contributor in contributors.iter_mut() {
        if contributor.is_individual {
            continue;
        }
        if let Some(org_name) = contributor.organisation_name.clone() {
            let lower = org_name.to_lowercase();
            if orgs::is_individual(&org_name) {
                contributor.reassign_as_person();
            } else if (lower == "sponsor" || lower == "company internal")
                && sponsor_name.is_some()
            {
                contributor.organisation_name = sponsor_name.clone();
            }
        }
    }

    s.identifiers = identifiers;
    s.titles = titles;
    s.contributors = contributors;
    s.references = reconcile::reconcile_references(references);
    s.links = links;
    s.ipd_info = ipd_info;
    s.topics = topics;
    s.features = features;
    s.relationships = relationships;
    s.data_objects = data_objects;

    Some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_doc() -> Value {
        serde_json::json!({
            "protocolSection": {
                "identificationModule": {
                    "nctId": "NCT00000001",
                    "briefTitle": "Example Study"
                },
                "statusModule": {
                    "overallStatus": "Completed"
                }
            },
            "hasResults": false
        })
    }

    #[test]
    fn test_minimal_document_end_to_end() {
        let s = process(&minimal_doc(), None).unwrap();
        assert_eq!(s.sd_sid, "NCT00000001");
        assert_eq!(s.display_title.as_deref(), Some("Example Study"));
        assert_eq!(s.study_status_id, Some(21));

        // exactly one default title
        let defaults: Vec<_> = s.titles.iter().filter(|t| t.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].title_text, "Example Study");

        // exactly one identifier, the registry id
        assert_eq!(s.identifiers.len(), 1);
        assert_eq!(s.identifiers[0].identifier_value, "NCT00000001");
        assert_eq!(s.identifiers[0].identifier_type_id, 11);

        // the registry web page object, with the fixed derived identity
        assert_eq!(s.data_objects.len(), 1);
        let obj = &s.data_objects[0];
        assert_eq!(obj.display_title, "Example Study :: CTG Registry entry");
        assert_eq!(
            obj.sd_oid,
            hash::object_hash("NCT00000001", "Example Study :: CTG Registry entry")
        );
        assert_eq!(obj.object_type_id, 13);
    }

    #[test]
    fn test_missing_mandatory_sections_returns_none() {
        let doc = serde_json::json!({
            "protocolSection": {
                "descriptionModule": { "briefSummary": "text" }
            }
        });
        assert!(process(&doc, None).is_none());
    }

    #[test]
    fn test_title_priority_official_only() {
        let doc = serde_json::json!({
            "protocolSection": {
                "identificationModule": {
                    "nctId": "NCT00000002",
                    "officialTitle": "An Official Title",
                    "acronym": "AOT"
                },
                "statusModule": { "overallStatus": "Recruiting" }
            }
        });
        let s = process(&doc, None).unwrap();
        let defaults: Vec<_> = s.titles.iter().filter(|t| t.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].title_type_id, 17);
        assert_eq!(s.display_title.as_deref(), Some("An Official Title"));
        // registry object falls back to the scientific-name title type
        assert_eq!(s.data_objects[0].titles[0].title_type_id, 24);
    }

    #[test]
    fn test_sentinel_enrolment_rejected() {
        let mut doc = minimal_doc();
        doc["protocolSection"]["designModule"] = serde_json::json!({
            "studyType": "INTERVENTIONAL",
            "enrollmentInfo": { "count": 9999 }
        });
        let s = process(&doc, None).unwrap();
        assert_eq!(s.study_enrolment, None);
    }

    #[test]
    fn test_date_shaped_enrolment_rejected() {
        let mut doc = minimal_doc();
        doc["protocolSection"]["designModule"] = serde_json::json!({
            "enrollmentInfo": { "count": "2014-06-01" }
        });
        let s = process(&doc, None).unwrap();
        assert_eq!(s.study_enrolment, None);
    }

    #[test]
    fn test_ordinary_enrolment_accepted() {
        let mut doc = minimal_doc();
        doc["protocolSection"]["designModule"] = serde_json::json!({
            "enrollmentInfo": { "count": 240 }
        });
        let s = process(&doc, None).unwrap();
        assert_eq!(s.study_enrolment, Some(240));
    }

    #[test]
    fn test_anticipated_dates_excluded() {
        let mut doc = minimal_doc();
        doc["protocolSection"]["statusModule"]["studyFirstPostDateStruct"] =
            serde_json::json!({ "date": "2021-06-01", "type": "ANTICIPATED" });
        let s = process(&doc, None).unwrap();
        assert!(s.data_objects[0].dates.is_empty());
        assert_eq!(s.data_objects[0].publication_year, None);
    }

    #[test]
    fn test_estimated_date_is_annotated() {
        let mut doc = minimal_doc();
        doc["protocolSection"]["statusModule"]["studyFirstPostDateStruct"] =
            serde_json::json!({ "date": "June 2021", "type": "ESTIMATED" });
        let s = process(&doc, None).unwrap();
        let date = &s.data_objects[0].dates[0];
        assert_eq!(date.date_as_string.as_deref(), Some("2021 Jun (est.)"));
    }

    #[test]
    fn test_expanded_access_relationship_pair() {
        let mut doc = minimal_doc();
        doc["protocolSection"]["statusModule"]["expandedAccessInfo"] =
            serde_json::json!({ "nctId": "NCT09999999" });
        let s = process(&doc, None).unwrap();
        assert_eq!(s.relationships.len(), 2);
        assert_eq!(s.relationships[0].relationship_type_id, 23);
        assert_eq!(s.relationships[0].target_sd_sid, "NCT09999999");
        assert_eq!(s.relationships[1].sd_sid, "NCT09999999");
        assert_eq!(s.relationships[1].relationship_type_id, 24);
    }

    #[test]
    fn test_mesh_and_freetext_topics_deduplicated() {
        let mut doc = minimal_doc();
        doc["derivedSection"] = serde_json::json!({
            "conditionBrowseModule": {
                "meshes": [{ "id": "D003924", "term": "Diabetes Mellitus, Type 2" }]
            }
        });
        doc["protocolSection"]["conditionsModule"] = serde_json::json!({
            "conditions": ["Diabetes Mellitus, Type 2", "Obesity"],
            "keywords": ["diabetes mellitus, type 2", "metformin"]
        });
        let s = process(&doc, None).unwrap();
        let values: Vec<&str> = s.topics.iter().map(|t| t.topic_value.as_str()).collect();
        assert_eq!(values, vec!["Diabetes Mellitus, Type 2", "Obesity", "metformin"]);
    }

    #[test]
    fn test_age_split() {
        let mut doc = minimal_doc();
        doc["protocolSection"]["eligibilityModule"] = serde_json::json!({
            "sex": "ALL",
            "minimumAge": "18 Years",
            "maximumAge": "6 Month"
        });
        let s = process(&doc, None).unwrap();
        assert_eq!(s.study_gender_elig.as_deref(), Some("Both"));
        assert_eq!(s.study_gender_elig_id, Some(900));
        assert_eq!(s.min_age, Some(18));
        assert_eq!(s.min_age_units.as_deref(), Some("Years"));
        assert_eq!(s.min_age_units_id, Some(17));
        assert_eq!(s.max_age, Some(6));
        assert_eq!(s.max_age_units.as_deref(), Some("Months"));
    }

    #[test]
    fn test_large_doc_type_table() {
        let mut doc = minimal_doc();
        doc["documentSection"] = serde_json::json!({
            "largeDocumentModule": {
                "largeDocs": [
                    { "typeAbbrev": "Prot_SAP", "date": "2019-03-04",
                      "filename": "Prot_SAP_000.pdf" },
                    { "typeAbbrev": "ICF", "label": "Consent form",
                      "filename": "ICF_001.pdf" }
                ]
            }
        });
        let s = process(&doc, None).unwrap();
        assert_eq!(s.data_objects.len(), 3);
        let prot_sap = &s.data_objects[1];
        assert_eq!(prot_sap.object_type_id, 74);
        assert_eq!(prot_sap.publication_year, Some(2019));
        assert!(prot_sap.instances[0].url.as_deref().unwrap()
            .contains("/ProvidedDocs/01/NCT00000001/Prot_SAP_000.pdf"));
        let icf = &s.data_objects[2];
        assert_eq!(icf.object_type_id, 18);
        assert_eq!(icf.display_title, "Example Study :: Consent form");
        assert_eq!(icf.titles[0].title_type_id, 21);
    }

    #[test]
    fn test_gsk_ipd_dataset_object() {
        let mut doc = minimal_doc();
        doc["protocolSection"]["sponsorCollaboratorsModule"] = serde_json::json!({
            "leadSponsor": { "name": "GlaxoSmithKline" }
        });
        doc["protocolSection"]["referencesModule"] = serde_json::json!({
            "availIpds": [{
                "id": "1234",
                "type": "Individual Participant Data Set",
                "url": "https://clinicalstudydatarequest.com/Study.aspx?id=1234"
            }]
        });
        let s = process(&doc, None).unwrap();
        let dataset_obj = s.data_objects.iter().find(|o| o.object_type_id == 80).unwrap();
        assert_eq!(dataset_obj.object_class_id, 14);
        assert_eq!(dataset_obj.managing_org_id, Some(org::GSK));
        assert_eq!(dataset_obj.display_title, "GSK-1234 :: Individual Participant Data");
        let ds = dataset_obj.dataset.as_ref().unwrap();
        assert_eq!(ds.record_keys_type_id, 3);
        assert_eq!(ds.deident_type_id, 2);
    }

    #[test]
    fn test_unmatched_ipd_entry_goes_to_ipd_info() {
        let mut doc = minimal_doc();
        doc["protocolSection"]["referencesModule"] = serde_json::json!({
            "availIpds": [{
                "type": "Study Protocol",
                "url": "https://example.org/protocol.pdf",
                "comment": "on request"
            }]
        });
        let s = process(&doc, None).unwrap();
        assert_eq!(s.ipd_info.len(), 1);
        assert_eq!(s.ipd_info[0].ipd_type.as_deref(), Some("Study Protocol"));
    }

    #[test]
    fn test_boilerplate_see_also_links_dropped() {
        let mut doc = minimal_doc();
        doc["protocolSection"]["referencesModule"] = serde_json::json!({
            "seeAlsoLinks": [
                { "label": "Mayo Clinic Clinical Trials", "url": "https://www.mayo.edu/research" },
                { "label": "Related consortium page", "url": "https://example.org/consortium" }
            ]
        });
        let s = process(&doc, None).unwrap();
        assert_eq!(s.links.len(), 1);
        assert_eq!(s.links[0].link_label.as_deref(), Some("Related consortium page"));
    }

    #[test]
    fn test_retraction_reference_tagged() {
        let mut doc = minimal_doc();
        doc["protocolSection"]["referencesModule"] = serde_json::json!({
            "references": [{
                "type": "RESULT",
                "pmid": "31000000",
                "citation": "Primary results paper",
                "retractions": [{ "pmid": "32000000", "source": "Journal notice" }]
            }]
        });
        let s = process(&doc, None).unwrap();
        assert_eq!(s.references.len(), 2);
        assert_eq!(s.references[1].comments.as_deref(), Some("RETRACTION"));
    }

    #[test]
    fn test_individual_sponsor_reassigned_to_person() {
        let mut doc = minimal_doc();
        doc["protocolSection"]["sponsorCollaboratorsModule"] = serde_json::json!({
            "leadSponsor": { "name": "Dr Jane Roe" }
        });
        let s = process(&doc, None).unwrap();
        let sponsor = &s.contributors[0];
        assert!(sponsor.is_individual);
        assert_eq!(sponsor.person_full_name.as_deref(), Some("Dr Jane Roe"));
        assert!(sponsor.organisation_name.is_none());
    }

    #[test]
    fn test_results_object_requires_results_data() {
        let mut doc = minimal_doc();
        doc["protocolSection"]["statusModule"]["resultsFirstPostDateStruct"] =
            serde_json::json!({ "date": "2020-02-02", "type": "ACTUAL" });
        // hasResults is false, so no results object
        let s = process(&doc, None).unwrap();
        assert!(s.data_objects.iter().all(|o| o.object_type_id != 28));

        doc["hasResults"] = serde_json::json!(true);
        let s = process(&doc, None).unwrap();
        let results = s.data_objects.iter().find(|o| o.object_type_id == 28).unwrap();
        assert_eq!(results.publication_year, Some(2020));
    }
}
