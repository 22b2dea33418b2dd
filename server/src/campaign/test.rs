#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};

    use rust_decimal::prelude::*;

    use crate::campaign::{
        build_campaign, format_prize_amount, prize_pool, total_winners, CreateCampaignPayload,
    };
    use crate::testing::{
        create, giveaway_campaign, instant_campaign, send, test_app, window, OTHER_OWNER, OWNER,
    };
    use crate::types::{InstantReward, PrizeTier, RewardType};

    fn payload(value: Value) -> CreateCampaignPayload {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn create_get_list_delete_campaign() {
        let (app, _) = test_app();

        let created = create(&app, instant_campaign("Summer Drop", 10)).await;
        assert_eq!(created["id"], "summer-drop");
        assert_eq!(created["owner"], OWNER);
        assert_eq!(created["prizeAmount"], "1.00");
        assert_eq!(created["totalWinners"], 10);
        assert_eq!(created["status"], "active");
        assert_eq!(created["timeline"], "7 days");
        assert_eq!(created["hasSessionKey"], true);
        assert!(created.get("sessionPrivateKey").is_none());

        let tasks = created["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0]["label"], "Follow on X");
        assert_eq!(tasks[1]["label"], "Say hi on Telegram");

        let (status, fetched) = send(&app, Method::GET, "/campaign/summer-drop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["title"], "Summer Drop");
        assert_eq!(fetched["clicks"], 0);

        create(&app, giveaway_campaign("Winter Raffle")).await;

        let (status, listed) =
            send(&app, Method::GET, &format!("/campaign?owner={}", OWNER), None).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = listed
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["winter-raffle", "summer-drop"]);

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/campaign/summer-drop?owner={}", OWNER),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, Method::GET, "/campaign/summer-drop", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["NotFound"], "Campaign summer-drop doesn't exist");
    }

    #[tokio::test]
    async fn owner_lookup_ignores_address_case() {
        let (app, _) = test_app();
        create(&app, giveaway_campaign("Raffle")).await;

        let (status, listed) = send(
            &app,
            Method::GET,
            &format!("/campaign?owner={}", OWNER.to_uppercase().replacen("0X", "0x", 1)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn only_the_owner_can_delete() {
        let (app, _) = test_app();
        create(&app, giveaway_campaign("Raffle")).await;

        let (status, body) = send(
            &app,
            Method::DELETE,
            &format!("/campaign/raffle?owner={}", OTHER_OWNER),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["Forbidden"], "Only the campaign owner can delete it");

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/campaign/missing?owner={}", OWNER),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::GET, "/campaign/raffle", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn duplicate_title_conflicts() {
        let (app, _) = test_app();
        create(&app, giveaway_campaign("Raffle")).await;

        let (status, body) =
            send(&app, Method::POST, "/campaign", Some(giveaway_campaign("raffle!"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["Conflict"].as_str().unwrap().contains("raffle"));
    }

    #[tokio::test]
    async fn invalid_payloads_are_rejected() {
        let (app, _) = test_app();

        let mut no_tasks = instant_campaign("No Tasks", 3);
        no_tasks["tasks"] = json!([]);

        let mut backwards = instant_campaign("Backwards", 3);
        let (start, end) = window(-1, 1);
        backwards["startDate"] = json!(end);
        backwards["endDate"] = json!(start);

        let mut no_winners = instant_campaign("No Winners", 0);
        no_winners["instantReward"]["numberOfWinners"] = json!(0);

        let mut bad_amount = instant_campaign("Bad Amount", 3);
        bad_amount["instantReward"]["amountPerWinner"] = json!("lots");

        let mut bad_key = instant_campaign("Bad Key", 3);
        bad_key["sessionPrivateKey"] = json!("0x1234");

        let mut bad_owner = giveaway_campaign("Bad Owner");
        bad_owner["owner"] = json!("alice");

        let mut no_tiers = giveaway_campaign("No Tiers");
        no_tiers["prizeTiers"] = json!([]);

        for body in [no_tasks, backwards, no_winners, bad_amount, bad_key, bad_owner, no_tiers] {
            let title = body["title"].clone();
            let (status, response) = send(&app, Method::POST, "/campaign", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{title}: {response}");
            assert!(response["BadRequest"].is_string());
        }

        let (_, listed) =
            send(&app, Method::GET, &format!("/campaign?owner={}", OWNER), None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_follows_the_window() {
        let (app, _) = test_app();

        let mut ended = giveaway_campaign("Old Raffle");
        let (start, end) = window(-48, -24);
        ended["startDate"] = json!(start);
        ended["endDate"] = json!(end);
        let ended = create(&app, ended).await;
        assert_eq!(ended["status"], "ended");
        assert_eq!(ended["timeRemaining"]["text"], "Ended");
        assert_eq!(ended["timeRemaining"]["isEnded"], true);

        let mut scheduled = giveaway_campaign("Next Raffle");
        let (start, end) = window(24, 48);
        scheduled["startDate"] = json!(start);
        scheduled["endDate"] = json!(end);
        let scheduled = create(&app, scheduled).await;
        assert_eq!(scheduled["status"], "scheduled");
        assert!(scheduled["timeRemaining"]["text"]
            .as_str()
            .unwrap()
            .starts_with("Starts in "));
    }

    #[tokio::test]
    async fn clicks_are_counted() {
        let (app, _) = test_app();
        create(&app, giveaway_campaign("Raffle")).await;

        for _ in 0..3 {
            let (status, _) = send(&app, Method::POST, "/campaign/raffle/click", None).await;
            assert_eq!(status, StatusCode::NO_CONTENT);
        }

        let (_, fetched) = send(&app, Method::GET, "/campaign/raffle", None).await;
        assert_eq!(fetched["clicks"], 3);

        let (status, _) = send(&app, Method::POST, "/campaign/missing/click", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn giveaway_tiers_are_summed_and_named() {
        let campaign = build_campaign(payload(giveaway_campaign("Raffle")), Utc::now()).unwrap();

        assert_eq!(campaign.prize_amount, "1.00");
        assert_eq!(campaign.prize_tiers[0].name, "1st place");
        assert_eq!(campaign.prize_tiers[1].name, "Prize Tier 2");
        assert_eq!(campaign.prize_type, "ETH");
        assert!(campaign.instant_reward.is_none());
        assert_eq!(campaign.timeline, "1 day");
    }

    #[test]
    fn blank_titles_fall_back() {
        let campaign = build_campaign(payload(giveaway_campaign("   ")), Utc::now()).unwrap();

        assert_eq!(campaign.title, "Untitled Room");
        assert_eq!(campaign.id.len(), 8);
    }

    #[test]
    fn owner_is_stored_lowercase() {
        let mut body = giveaway_campaign("Raffle");
        body["owner"] = json!("0x52908400098527886E0F7030069857D2E4169EE7");
        let campaign = build_campaign(payload(body), Utc::now()).unwrap();

        assert_eq!(campaign.owner, OWNER);
    }

    #[test]
    fn prize_pool_by_reward_type() {
        let instant = InstantReward {
            amount_per_winner: "0.25".to_string(),
            number_of_winners: 4,
        };
        assert_eq!(
            prize_pool(RewardType::Instant, Some(&instant), &[]),
            Ok(dec!(1))
        );
        assert_eq!(total_winners(RewardType::Instant, Some(&instant), &[]), 4);

        let tiers = vec![PrizeTier {
            id: "t1".to_string(),
            name: "Grand".to_string(),
            amount: "2".to_string(),
            winners: 3,
        }];
        assert_eq!(
            prize_pool(RewardType::Giveaway, Some(&instant), &tiers),
            Ok(dec!(6))
        );
        assert_eq!(total_winners(RewardType::Giveaway, Some(&instant), &tiers), 3);

        assert_eq!(total_winners(RewardType::Instant, None, &tiers), 0);
    }

    #[test]
    fn large_amounts_keep_every_digit() {
        let mut body = instant_campaign("Whale Drop", 1);
        body["instantReward"]["amountPerWinner"] = json!("9007199254740993");
        let campaign = build_campaign(payload(body), Utc::now()).unwrap();

        assert_eq!(campaign.prize_amount, "9007199254740993.00");
        assert_eq!(campaign.prize_pool, dec!(9007199254740993));
    }

    #[test]
    fn prize_amounts_have_two_decimals() {
        assert_eq!(format_prize_amount(dec!(1)), "1.00");
        assert_eq!(format_prize_amount(dec!(0.5)), "0.50");
        assert_eq!(format_prize_amount(dec!(0.125)), "0.13");
        assert_eq!(format_prize_amount(dec!(0.333333)), "0.33");
    }

    #[test]
    fn rejects_windows_that_do_not_advance() {
        let mut body = giveaway_campaign("Raffle");
        let start = Utc::now() + Duration::hours(1);
        body["startDate"] = json!(start.to_rfc3339());
        body["endDate"] = json!(start.to_rfc3339());

        assert!(build_campaign(payload(body), Utc::now()).is_err());
    }
}
