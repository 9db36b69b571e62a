//! Built-in skin condition profiles.
//!
//! These seed the skin-conditions collection during ingestion. Each profile
//! pairs a display name with a descriptive text written to embed well:
//! characteristics, skincare goals, and the ingredient vocabulary a matching
//! product description would use.

/// Named skin condition profiles, in stable ingestion order.
pub const SKIN_CONDITION_PROFILES: &[(&str, &str)] = &[
    (
        "Oily Skin",
        "Oily skin overproduces sebum, leaving a shiny or greasy appearance, \
         especially in the T-zone, with enlarged pores prone to blackheads, \
         whiteheads, and acne breakouts. The goal is to manage excess oil and \
         keep pores clear without stripping moisture. Helpful products include \
         gel or foaming cleansers, salicylic acid (BHA) exfoliants, niacinamide \
         serums for oil regulation, lightweight oil-free non-comedogenic \
         moisturizers, and clay masks. Look for oil-control, mattifying, \
         pore-refining, and clarifying formulas; avoid heavy occlusive creams \
         and harsh stripping cleansers that trigger rebound oiliness.",
    ),
    (
        "Dry Skin",
        "Dry skin lacks oil and often water, feeling tight, rough, or flaky, \
         sometimes with dullness and irritation from a weakened moisture \
         barrier. The goal is to replenish lipids, boost hydration, and repair \
         the barrier. Helpful products include cream or balm cleansers, rich \
         moisturizers with ceramides, glycerin, and hyaluronic acid, facial \
         oils, and gentle lactic acid exfoliation. Look for hydrating, \
         nourishing, barrier-repair formulas; avoid foaming sulfates, \
         high-alcohol toners, and hot water that strip natural oils.",
    ),
    (
        "Acne",
        "Acne-prone skin develops comedones, papules, and pustules when pores \
         clog with sebum and dead cells and become inflamed. The goal is to \
         keep pores clear, reduce bacteria and inflammation, and prevent new \
         breakouts while avoiding over-drying. Helpful ingredients include \
         salicylic acid, benzoyl peroxide, retinoids such as adapalene, \
         niacinamide, and azelaic acid, in lightweight non-comedogenic bases. \
         Look for blemish-control, anti-breakout, and pore-clearing formulas; \
         avoid comedogenic oils and aggressive scrubbing that worsens \
         inflammation.",
    ),
    (
        "Wrinkles",
        "Wrinkles, from fine lines to deeper furrows, develop as collagen and \
         elastin decline with age and sun exposure. The goal is to stimulate \
         collagen production, improve hydration and plumpness, and protect \
         against further photoaging. Helpful ingredients include retinoids \
         (retinol, retinaldehyde, tretinoin), peptides, vitamin C and other \
         antioxidants, glycolic and lactic acid, hyaluronic acid, and daily \
         broad-spectrum sunscreen. Look for anti-aging, firming, \
         collagen-boosting, and smoothing formulas.",
    ),
    (
        "Redness",
        "Facial redness shows as flushing, a persistent pink or red hue, or \
         visible blood vessels, often with sensitivity, warmth, or stinging, \
         and is aggravated by sun, heat, and harsh products. The goal is to \
         calm irritation, strengthen the skin barrier, and reduce visible \
         redness. Helpful ingredients include centella asiatica, allantoin, \
         bisabolol, green tea, ceramides, panthenol, and colloidal oatmeal in \
         fragrance-free formulas. Look for soothing, calming, and \
         redness-relief products; avoid alcohol-heavy toners, fragrance, and \
         strong acids.",
    ),
    (
        "Dark Spots",
        "Dark spots and hyperpigmentation are patches of excess melanin left \
         by sun damage, acne, or hormonal changes, producing an uneven skin \
         tone. The goal is to fade existing discoloration, even the \
         complexion, and prevent new spots. Helpful ingredients include \
         vitamin C, niacinamide, alpha arbutin, tranexamic acid, azelaic acid, \
         AHA exfoliants, retinoids, and strict daily sunscreen. Look for \
         brightening, tone-correcting, and dark-spot-fading formulas.",
    ),
];

/// Look up a profile description by name, case-insensitive.
#[inline]
pub fn profile_by_name(name: &str) -> Option<&'static str> {
    SKIN_CONDITION_PROFILES
        .iter()
        .find(|(profile_name, _)| profile_name.eq_ignore_ascii_case(name))
        .map(|(_, description)| *description)
}
