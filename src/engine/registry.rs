use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{json, Value};

use super::facet::{Facet, FacetContext, PlaceholderFacet};
use super::facets::{
    LocaleFacet, LoggingMethodsFacet, NavigationMethodsFacet, RouterFacet, SoundFacet,
    LOCALE_FACET, ROUTER_FACET,
};

pub type FacetConstructor = fn(&str, &FacetContext) -> Rc<dyn Facet>;

type LoggedMethods = &'static [(&'static str, fn() -> Value)];

/// Name to constructor mapping; one instance of each facet per engine.
#[derive(Clone)]
pub struct FacetRegistry {
    constructors: Vec<(String, FacetConstructor)>,
}

impl Default for FacetRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl FacetRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: Vec::new(),
        }
    }

    /// Every facet the shim knows about.
    pub fn standard() -> Self {
        Self {
            constructors: STANDARD_FACETS
                .iter()
                .map(|(name, constructor)| (name.to_string(), *constructor))
                .collect(),
        }
    }

    /// Add `name`, replacing an existing constructor with the same name.
    pub fn with_facet(mut self, name: &str, constructor: FacetConstructor) -> Self {
        match self.constructors.iter_mut().find(|(existing, _)| existing == name) {
            Some(slot) => slot.1 = constructor,
            None => self.constructors.push((name.to_string(), constructor)),
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.iter().any(|(existing, _)| existing == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    pub fn instantiate(&self, context: &FacetContext) -> HashMap<String, Rc<dyn Facet>> {
        self.constructors
            .iter()
            .map(|(name, constructor)| (name.clone(), constructor(name, context)))
            .collect()
    }
}

impl fmt::Debug for FacetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

const STANDARD_FACETS: &[(&str, FacetConstructor)] = &[
    // core
    (LOCALE_FACET, locale),
    ("core.deviceInformation", placeholder),
    ("core.safeZone", placeholder),
    ("core.featureFlags", placeholder),
    ("core.splitScreen", placeholder),
    ("core.input", placeholder),
    ("core.screenReader", methods),
    (ROUTER_FACET, router),
    ("core.customScaling", placeholder),
    ("core.animation", placeholder),
    ("core.sound", sound),
    ("core.social", placeholder),
    ("core.user", placeholder),
    ("core.performanceFacet", placeholder),
    // vanilla
    ("vanilla.achievements", placeholder),
    ("vanilla.achievementsReward", placeholder),
    ("vanilla.createNewWorld", methods),
    ("vanilla.telemetry", methods),
    ("vanilla.createNewWorldBeta", methods),
    ("vanilla.userAccount", methods),
    ("vanilla.buildSettings", placeholder),
    ("vanilla.debugSettings", placeholder),
    ("vanilla.resourcePacks", placeholder),
    ("vanilla.options", placeholder),
    ("vanilla.simulationDistanceOptions", placeholder),
    ("vanilla.seedTemplates", placeholder),
    ("vanilla.realmsStories", placeholder),
    ("vanilla.playermessagingservice", placeholder),
    ("vanilla.playerReport", methods),
    ("vanilla.marketplaceSuggestions", placeholder),
    ("vanilla.playerBanned", methods),
    ("vanilla.editor", placeholder),
    ("vanilla.editorInput", placeholder),
    // badger
    ("badger.genericPreGame", placeholder),
    ("badger.genericPreGameMethods", placeholder),
    ("badger.genericInGame", placeholder),
    ("badger.genericInGameMethods", methods),
    ("badger.badgerStartMenu", placeholder),
    ("badger.badgerStartMenuMethods", start_menu_methods),
    ("badger.lobby", placeholder),
    ("badger.lobbyMethods", placeholder),
    ("badger.settings", placeholder),
    ("badger.settingsMethods", methods),
    ("badger.screenUtil", placeholder),
    ("badger.screenUtilMethods", placeholder),
    ("badger.badgerCommonInput", placeholder),
    ("badger.badgerCommonInputMethods", methods),
    ("badger.marketplace", placeholder),
    ("badger.marketplaceMethods", placeholder),
    ("badger.badgerInvite", placeholder),
    ("badger.badgerInviteMethods", placeholder),
    ("badger.genericCommon", placeholder),
    ("badger.genericCommonMethods", placeholder),
    ("badger.playerInfo", placeholder),
    ("badger.endCredits", placeholder),
    ("badger.hud", placeholder),
    ("badger.hudLowVolume", placeholder),
    ("badger.hotbar", placeholder),
    ("badger.badgerInput", placeholder),
    ("badger.subtitles", placeholder),
    ("badger.highVolume", placeholder),
    ("badger.radialMenu", placeholder),
    ("badger.resources", placeholder),
    ("badger.ticketTimers", placeholder),
    ("badger.debugDraw", placeholder),
    ("badger.songbook", placeholder),
    ("badger.uiEvent", placeholder),
];

const START_MENU_ROUTES: &[(&str, &str)] = &[("openSettings", "/badger/settings")];

fn locale(name: &str, context: &FacetContext) -> Rc<dyn Facet> {
    Rc::new(LocaleFacet::new(name, context))
}

fn router(name: &str, context: &FacetContext) -> Rc<dyn Facet> {
    Rc::new(RouterFacet::new(name, context))
}

fn sound(name: &str, _context: &FacetContext) -> Rc<dyn Facet> {
    Rc::new(SoundFacet::new(name))
}

fn start_menu_methods(name: &str, context: &FacetContext) -> Rc<dyn Facet> {
    Rc::new(NavigationMethodsFacet::new(name, context, START_MENU_ROUTES))
}

fn placeholder(name: &str, _context: &FacetContext) -> Rc<dyn Facet> {
    Rc::new(PlaceholderFacet::new(name, placeholder_state(name)))
}

fn methods(name: &str, _context: &FacetContext) -> Rc<dyn Facet> {
    Rc::new(LoggingMethodsFacet::new(
        name,
        placeholder_state(name),
        logged_methods(name),
    ))
}

fn null() -> Value {
    Value::Null
}

fn empty_list() -> Value {
    json!([])
}

const SCREEN_READER_METHODS: LoggedMethods = &[("read", null), ("clear", null)];
const CREATE_WORLD_METHODS: LoggedMethods =
    &[("applyTemplate", null), ("createOnRealms.call", null)];
const TELEMETRY_METHODS: LoggedMethods = &[("fireEventButtonPressed", null)];
const CREATE_WORLD_BETA_METHODS: LoggedMethods =
    &[("openFeedbackPage", null), ("optOutOfBeta", null)];
const USER_ACCOUNT_METHODS: LoggedMethods = &[
    ("showPremiumNetworkUpsellModal", null),
    ("showMicrosoftAccountLogInScreen", null),
];
const PLAYER_REPORT_METHODS: LoggedMethods = &[("reportPlayer", null)];
const PLAYER_BANNED_METHODS: LoggedMethods = &[("openBannedInfoPage", null)];
const IN_GAME_METHODS: LoggedMethods = &[("onScreenOpened", null)];
const SETTINGS_METHODS: LoggedMethods = &[
    ("setSettingCategory", null),
    ("initRemappingEventHandler", null),
];
const COMMON_INPUT_METHODS: LoggedMethods =
    &[("setUIIsGamepad", null), ("toPrimitive", empty_list)];

fn logged_methods(name: &str) -> LoggedMethods {
    match name {
        "core.screenReader" => SCREEN_READER_METHODS,
        "vanilla.createNewWorld" => CREATE_WORLD_METHODS,
        "vanilla.telemetry" => TELEMETRY_METHODS,
        "vanilla.createNewWorldBeta" => CREATE_WORLD_BETA_METHODS,
        "vanilla.userAccount" => USER_ACCOUNT_METHODS,
        "vanilla.playerReport" => PLAYER_REPORT_METHODS,
        "vanilla.playerBanned" => PLAYER_BANNED_METHODS,
        "badger.genericInGameMethods" => IN_GAME_METHODS,
        "badger.settingsMethods" => SETTINGS_METHODS,
        "badger.badgerCommonInputMethods" => COMMON_INPUT_METHODS,
        _ => &[],
    }
}

// Arbitrary development data; not a contract with the real engine.
fn placeholder_state(name: &str) -> Value {
    match name {
        "core.deviceInformation" => json!({
            "pixelsPerMillimeter": 3.78,
            "displayWidth": 1920,
            "displayHeight": 1080,
            "inputMethods": [0, 1, 2],
            "isLowMemoryDevice": false,
            "guiScaleBase": 4,
            "platform": 8,
            "guiScaleModifier": 0
        }),
        "core.safeZone" => json!({
            "safeAreaX": 1,
            "screenPositionX": 0,
            "safeAreaY": 1,
            "screenPositionY": 0
        }),
        "core.featureFlags" => json!({
            "flags": [
                "facet",
                "core.deviceInformation",
                "core.input",
                "core.locale",
                "core.router",
                "core.safeZone",
                "core.screenReader",
                "core.splitScreen",
                "vanilla.achievements",
                "vanilla.enableSeedTemplates"
            ]
        }),
        "core.splitScreen" => json!({
            "numActivePlayers": 1,
            "splitScreenDirection": 0,
            "splitScreenPosition": 0
        }),
        "core.input" => json!({
            "currentInputType": 2,
            "swapABButtons": false,
            "acceptInputFromAllControllers": false,
            "gameControllerId": 0,
            "swapXYButtons": false
        }),
        "core.screenReader" => json!({
            "isChatTextToSpeechEnabled": false,
            "isIdle": false,
            "isUITextToSpeechEnabled": false
        }),
        "core.customScaling" => json!({ "scalingModeOverride": 0, "fixedGuiScaleModifier": 0 }),
        "core.animation" => json!({ "screenAnimationEnabled": true }),
        "core.performanceFacet" => json!({ "frameTimeMs": 16, "gamefaceViewAdvanceTimeMs": 16 }),
        "vanilla.achievements" => json!({
            "status": 1,
            "data": {
                "achievementsUnlocked": 1,
                "maxGamerScore": 90,
                "hoursPlayed": 100,
                "achievements": [{
                    "id": "0",
                    "name": "Placeholder Achievement",
                    "gamerScore": 30,
                    "isLocked": false
                }]
            }
        }),
        "vanilla.createNewWorld" => json!({
            "isEditorWorld": false,
            "isUsingTemplate": false,
            "isLockedTemplate": false,
            "generalWarningState": 0
        }),
        "vanilla.createNewWorldBeta" => json!({ "isBetaSupported": true }),
        "vanilla.userAccount" => json!({
            "isTrialAccount": false,
            "isLoggedInWithMicrosoftAccount": true,
            "hasPremiumNetworkAccess": true
        }),
        "vanilla.buildSettings" => json!({ "isEduBuild": true, "isDevBuild": true }),
        "vanilla.debugSettings" => json!({ "isBiomeOverrideActive": false, "flatNether": false }),
        "vanilla.options" => json!({ "renderDistance": 5, "defaultRenderDistance": 10 }),
        "vanilla.simulationDistanceOptions" => json!({ "simulationDistanceOptions": [4, 6, 8, 10] }),
        "vanilla.seedTemplates" => json!({
            "templates": [{ "seedValue": "0", "title": "The Nothing Seed" }]
        }),
        "vanilla.marketplaceSuggestions" => json!({ "getMorePacks": { "title": "test", "pageId": 0 } }),
        "vanilla.editor" => json!({ "editorTools": { "selectedTool": 0 } }),
        "badger.genericPreGame" => json!({
            "isPublishBuild": false,
            "shouldPlaySplashVideo": false,
            "shouldPlayLogoVideo": false
        }),
        "badger.genericCommon" => json!({ "localPlayerPlatform": 0, "uiStyle": 0 }),
        "badger.genericInGame" => json!({ "emphasizedHUDItems": [] }),
        "badger.badgerCommonInput" => json!({ "remappingButtonData": [] }),
        "badger.settings" => json!({ "settingCategories": [] }),
        "badger.endCredits" => json!({ "creditsText": ["placeholder credits"] }),
        "badger.playerInfo" => json!({
            "currentHealth": 20,
            "totalHealth": 20,
            "isTakingDamage": false
        }),
        "badger.hudLowVolume" => json!({
            "hudMessages": [],
            "logMessages": [],
            "cinematicData": [],
            "hudVisibility": [],
            "isTapToSkipCinematic": false
        }),
        "badger.hotbar" => json!({
            "hotbarItems": [],
            "currentHotbarSlot": 0,
            "currentToolbarId": 0,
            "hotbarQuickBuildItem": null,
            "showToolbarDisplay": true
        }),
        "badger.badgerInput" => json!({
            "buttonMappingData": [],
            "keyStates": [],
            "actionKeysPressed": [],
            "currentInputMethod": 0
        }),
        "badger.subtitles" => json!({ "VOSubtitles": [], "devSubtitles": [] }),
        "badger.highVolume" => json!({
            "objectiveHealthBars": [],
            "onscreenWaypointMarkers": [],
            "displayedGlobalTimer": true
        }),
        "badger.hud" => json!({
            "canAffordBuildable": true,
            "isInBattleView": false,
            "isInBuildPreview": false
        }),
        "badger.resources" => json!({
            "economyTickets": [],
            "hudTeamResources": [],
            "hudContextualResources": []
        }),
        "badger.radialMenu" => json!({
            "isMenuShowing": false,
            "currentLuredUnitCount": 0,
            "lureCap": 5
        }),
        _ => json!({}),
    }
}
