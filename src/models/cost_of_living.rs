use serde::{Deserialize, Serialize};

use crate::slug::city_country_id;

/// One price snapshot per location, keyed by `city-country`.
///
/// Missing or unknown prices are stored as `0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CostOfLivingRecord {
    pub city: String,
    pub country: String,

    pub meal_inexpensive_restaurant: f64,
    #[serde(rename = "mealFor2MidRange")]
    pub meal_for_two_mid_range: f64,
    pub combo_meal_mcdonalds: f64,
    pub domestic_beer_restaurant: f64,
    pub imported_beer_restaurant: f64,
    pub cappuccino_restaurant: f64,
    pub soda_restaurant: f64,
    pub water_restaurant: f64,

    #[serde(rename = "milk1L")]
    pub milk_1l: f64,
    pub bread_loaf: f64,
    #[serde(rename = "rice1Kg")]
    pub rice_1kg: f64,
    #[serde(rename = "eggs12Pack")]
    pub eggs_12_pack: f64,
    #[serde(rename = "localCheese1Kg")]
    pub local_cheese_1kg: f64,
    #[serde(rename = "chickenFillet1Kg")]
    pub chicken_fillet_1kg: f64,
    #[serde(rename = "beefRound1Kg")]
    pub beef_round_1kg: f64,
    #[serde(rename = "apples1Kg")]
    pub apples_1kg: f64,
    #[serde(rename = "banana1Kg")]
    pub banana_1kg: f64,
    #[serde(rename = "oranges1Kg")]
    pub oranges_1kg: f64,
    #[serde(rename = "tomato1Kg")]
    pub tomato_1kg: f64,
    #[serde(rename = "potato1Kg")]
    pub potato_1kg: f64,
    #[serde(rename = "onion1Kg")]
    pub onion_1kg: f64,
    pub lettuce_head: f64,
    #[serde(rename = "water1_5LMarket")]
    pub water_1_5l_market: f64,
    pub wine_mid_range: f64,
    pub domestic_beer_market: f64,
    pub imported_beer_market: f64,
    pub cigarettes_pack: f64,

    pub ticket_one_way: f64,
    pub monthly_pass: f64,
    pub taxi_start: f64,
    #[serde(rename = "taxi1Km")]
    pub taxi_1km: f64,
    #[serde(rename = "taxiWaiting1Hour")]
    pub taxi_waiting_1_hour: f64,
    #[serde(rename = "gasoline1L")]
    pub gasoline_1l: f64,
    pub vw_golf_new: f64,
    pub toyota_corolla_new: f64,

    #[serde(rename = "utilities85sqmApartment")]
    pub utilities_85sqm_apartment: f64,
    #[serde(rename = "mobileTariff1Min")]
    pub mobile_tariff_1min: f64,
    pub internet_unlimited: f64,

    pub fitness_club_monthly: f64,
    pub tennis_court_hourly: f64,
    pub cinema_ticket: f64,
    pub preschool_monthly: f64,
    pub intl_primary_school_yearly: f64,

    pub jeans: f64,
    pub summer_dress: f64,
    pub nike_shoes: f64,
    pub leather_shoes: f64,

    #[serde(rename = "apt1BedCityCenter")]
    pub apt_1bed_city_center: f64,
    #[serde(rename = "apt1BedOutsideCenter")]
    pub apt_1bed_outside_center: f64,
    #[serde(rename = "apt3BedCityCenter")]
    pub apt_3bed_city_center: f64,
    #[serde(rename = "apt3BedOutsideCenter")]
    pub apt_3bed_outside_center: f64,
    pub price_per_sqm_city_center: f64,
    pub price_per_sqm_outside_center: f64,

    pub avg_net_salary: f64,
    pub mortgage_rate: f64,
    pub data_quality: i64,
}

impl CostOfLivingRecord {
    /// Document id shared by this record, its analytics and the city's safety score.
    pub fn document_id(&self) -> String {
        city_country_id(&self.city, &self.country)
    }
}

/// A scored metric: its stored name and how to read it off a record.
pub type Metric = (&'static str, fn(&CostOfLivingRecord) -> f64);

/// Metrics the analyzer scores, in output order.
pub static METRICS: &[Metric] = &[
    ("mealInexpensiveRestaurant", |r| r.meal_inexpensive_restaurant),
    ("mealFor2MidRange", |r| r.meal_for_two_mid_range),
    ("comboMealMcdonalds", |r| r.combo_meal_mcdonalds),
    ("domesticBeerRestaurant", |r| r.domestic_beer_restaurant),
    ("importedBeerRestaurant", |r| r.imported_beer_restaurant),
    ("cappuccinoRestaurant", |r| r.cappuccino_restaurant),
    ("sodaRestaurant", |r| r.soda_restaurant),
    ("waterRestaurant", |r| r.water_restaurant),
    ("wineMidRange", |r| r.wine_mid_range),
    ("domesticBeerMarket", |r| r.domestic_beer_market),
    ("importedBeerMarket", |r| r.imported_beer_market),
    ("cigarettesPack", |r| r.cigarettes_pack),
    ("ticketOneWay", |r| r.ticket_one_way),
    ("monthlyPass", |r| r.monthly_pass),
    ("taxiStart", |r| r.taxi_start),
    ("taxi1Km", |r| r.taxi_1km),
    ("gasoline1L", |r| r.gasoline_1l),
    ("utilities85sqmApartment", |r| r.utilities_85sqm_apartment),
    ("mobileTariff1Min", |r| r.mobile_tariff_1min),
    ("internetUnlimited", |r| r.internet_unlimited),
    ("fitnessClubMonthly", |r| r.fitness_club_monthly),
    ("apt1BedCityCenter", |r| r.apt_1bed_city_center),
    ("apt1BedOutsideCenter", |r| r.apt_1bed_outside_center),
    ("apt3BedCityCenter", |r| r.apt_3bed_city_center),
    ("apt3BedOutsideCenter", |r| r.apt_3bed_outside_center),
    ("pricePerSqmCityCenter", |r| r.price_per_sqm_city_center),
    ("pricePerSqmOutsideCenter", |r| r.price_per_sqm_outside_center),
    ("avgNetSalary", |r| r.avg_net_salary),
];
