use crate::settings::AppSettings;

/// What the user is looking at right now, as reported by the monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityProbe {
    pub process_name: String,
    pub window_title: String,
    /// Active tab URL or host when the foreground window is a browser.
    pub url: Option<String>,
}

impl ActivityProbe {
    pub fn process(process_name: &str) -> Self {
        Self {
            process_name: process_name.to_owned(),
            ..Self::default()
        }
    }

    pub fn browser(process_name: &str, url: &str) -> Self {
        Self {
            process_name: process_name.to_owned(),
            window_title: String::new(),
            url: Some(url.to_owned()),
        }
    }

    /// The text keywords are matched against: the URL when present, else the process name.
    pub fn match_target(&self) -> &str {
        match self.url.as_deref() {
            Some(url) if !url.trim().is_empty() => url,
            _ => &self.process_name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityClass {
    Work,
    Passive,
    Distraction,
    Unknown,
}

impl ActivityClass {
    pub fn is_trackable(self) -> bool {
        matches!(self, Self::Work | Self::Passive)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    work: Vec<String>,
    passive: Vec<String>,
    distraction: Vec<String>,
}

impl Classifier {
    pub fn new(work: &[String], passive: &[String], distraction: &[String]) -> Self {
        Self {
            work: normalize_keywords(work),
            passive: normalize_keywords(passive),
            distraction: normalize_keywords(distraction),
        }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(
            &settings.work_processes,
            &settings.passive_processes,
            &settings.distraction_processes,
        )
    }

    /// Distraction pre-empts everything; Passive wins over Work so idle detection stays off.
    pub fn classify(&self, probe: &ActivityProbe) -> ActivityClass {
        let target = probe.match_target().to_lowercase();
        if target.is_empty() {
            return ActivityClass::Unknown;
        }
        if contains_any(&target, &self.distraction) {
            ActivityClass::Distraction
        } else if contains_any(&target, &self.passive) {
            ActivityClass::Passive
        } else if contains_any(&target, &self.work) {
            ActivityClass::Work
        } else {
            ActivityClass::Unknown
        }
    }
}

fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

fn contains_any(target: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|keyword| target.contains(keyword.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    fn classifier() -> Classifier {
        Classifier::new(
            &list(&["code", "devenv", "youtube.com/watch?v=lecture"]),
            &list(&["vlc", "acrobat"]),
            &list(&["game", "youtube"]),
        )
    }

    #[test]
    fn distraction_wins_over_work_and_passive() {
        let c = Classifier::new(&list(&["chat"]), &list(&["chat"]), &list(&["chat"]));
        assert_eq!(c.classify(&ActivityProbe::process("chat.exe")), ActivityClass::Distraction);

        // "youtube" also prefixes a work keyword; distraction still wins.
        let url = "https://www.youtube.com/watch?v=lecture";
        assert_eq!(
            classifier().classify(&ActivityProbe::browser("chrome.exe", url)),
            ActivityClass::Distraction
        );
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let c = classifier();
        assert_eq!(c.classify(&ActivityProbe::process("Code.exe")), ActivityClass::Work);
        assert_eq!(c.classify(&ActivityProbe::process("DEVENV.EXE")), ActivityClass::Work);
        assert_eq!(c.classify(&ActivityProbe::process("VLC.exe")), ActivityClass::Passive);
        assert_eq!(c.classify(&ActivityProbe::process("explorer.exe")), ActivityClass::Unknown);
    }

    #[test]
    fn url_replaces_process_name_when_present() {
        let c = classifier();
        // chrome.exe itself matches nothing; the URL decides.
        let probe = ActivityProbe::browser("chrome.exe", "https://store.steampowered.com/game");
        assert_eq!(c.classify(&probe), ActivityClass::Distraction);

        let blank = ActivityProbe::browser("code.exe", "  ");
        assert_eq!(c.classify(&blank), ActivityClass::Work);
    }

    #[test]
    fn passive_beats_work_for_shared_keyword() {
        let c = Classifier::new(&list(&["reader"]), &list(&["reader"]), &[]);
        assert_eq!(c.classify(&ActivityProbe::process("reader.exe")), ActivityClass::Passive);
    }

    #[test]
    fn blank_keywords_never_match() {
        let c = Classifier::new(&list(&["", "  "]), &[], &list(&[" "]));
        assert_eq!(c.classify(&ActivityProbe::process("anything.exe")), ActivityClass::Unknown);
        assert_eq!(c.classify(&ActivityProbe::default()), ActivityClass::Unknown);
    }
}
